#![cfg(target_os = "windows")]

//! `WM_DEVICECHANGE` interception on the host's active window.
//!
//! The window is subclassed with `SetWindowSubclass`. The subclass procedure only
//! sets the device-change flag and forwards every message with `DefSubclassProc`.
//! The subclass is removed when the hook is dropped.

use crate::error::Error;
use crate::hotplug::{dispatch_message, DeviceChangeNotifier, MessageHook};
use log::{debug, info};
use std::ptr;
use windows_sys::Win32::Foundation::{GetLastError, HWND, LPARAM, LRESULT, WPARAM};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::GetActiveWindow;
use windows_sys::Win32::UI::Shell::{DefSubclassProc, RemoveWindowSubclass, SetWindowSubclass};

const SUBCLASS_ID: usize = 0x7061_6462;

/// Subclass hook on the window that was active at install time.
pub struct WindowHook {
    hwnd: HWND,
    notifier: *mut DeviceChangeNotifier,
}

impl WindowHook {
    pub fn new() -> Self {
        Self {
            hwnd: ptr::null_mut(),
            notifier: ptr::null_mut(),
        }
    }
}

impl Default for WindowHook {
    fn default() -> Self {
        Self::new()
    }
}

unsafe extern "system" fn subclass_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    _id: usize,
    ref_data: usize,
) -> LRESULT {
    if let Some(notifier) = (ref_data as *const DeviceChangeNotifier).as_ref() {
        if dispatch_message(msg, notifier) {
            debug!("[HOOK/MSG] WM_DEVICECHANGE");
        }
    }
    DefSubclassProc(hwnd, msg, wparam, lparam)
}

impl MessageHook for WindowHook {
    fn install(&mut self, notifier: DeviceChangeNotifier) -> Result<bool, Error> {
        if !self.hwnd.is_null() {
            return Err(Error::Hook("window subclass is already installed".into()));
        }

        // SAFETY: no preconditions; null means this thread has no active window.
        let hwnd = unsafe { GetActiveWindow() };
        if hwnd.is_null() {
            return Ok(false);
        }

        let data = Box::into_raw(Box::new(notifier));
        // SAFETY: `data` stays valid until `Drop` removes the subclass.
        let ok =
            unsafe { SetWindowSubclass(hwnd, Some(subclass_proc), SUBCLASS_ID, data as usize) };
        if ok == 0 {
            // SAFETY: `data` was never handed to Windows.
            drop(unsafe { Box::from_raw(data) });
            let code = unsafe { GetLastError() };
            return Err(Error::Hook(format!("SetWindowSubclass failed with code {code:#x}")));
        }

        self.hwnd = hwnd;
        self.notifier = data;
        info!("[HOOK/INSTALL] subclassed window {:p}", hwnd);
        Ok(true)
    }
}

impl Drop for WindowHook {
    fn drop(&mut self) {
        if self.hwnd.is_null() {
            return;
        }
        // SAFETY: removes the subclass installed by `install`, then frees its data.
        unsafe {
            RemoveWindowSubclass(self.hwnd, Some(subclass_proc), SUBCLASS_ID);
            drop(Box::from_raw(self.notifier));
        }
    }
}
