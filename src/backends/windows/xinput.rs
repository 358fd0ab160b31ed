#![cfg(target_os = "windows")]

//! XInput slot backend.
//!
//! XInput exposes up to four Xbox-family controllers by slot index with a fixed
//! report. The DLL is loaded at runtime; the first of
//! `xinput1_4`, `xinput1_3`, `xinput9_1_0`, `xinput1_2`, `xinput1_1` that exports
//! both entry points wins.
//!
//! `ERROR_DEVICE_NOT_CONNECTED` maps to [`BackendError::NotConnected`], which the
//! arbiter reads as "empty slot" and the adapter reads as "unplugged".

use crate::backends::{SlotBackend, SlotCapabilities, SlotState};
use crate::error::{BackendError, Error};
use log::{debug, info};
use windows_sys::Win32::Foundation::{
    FreeLibrary, ERROR_DEVICE_NOT_CONNECTED, ERROR_SUCCESS, HMODULE,
};
use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
use windows_sys::Win32::UI::Input::XboxController::{XINPUT_CAPABILITIES, XINPUT_STATE};

const DLL_NAMES: [&str; 5] = [
    "xinput1_4.dll",
    "xinput1_3.dll",
    "xinput9_1_0.dll",
    "xinput1_2.dll",
    "xinput1_1.dll",
];

type XInputGetStateFn = unsafe extern "system" fn(u32, *mut XINPUT_STATE) -> u32;
type XInputGetCapabilitiesFn =
    unsafe extern "system" fn(u32, u32, *mut XINPUT_CAPABILITIES) -> u32;

/// A loaded XInput DLL.
pub struct XInput {
    module: HMODULE,
    get_state: XInputGetStateFn,
    get_capabilities: XInputGetCapabilitiesFn,
}

impl XInput {
    pub fn load() -> Result<Self, Error> {
        for dll in DLL_NAMES {
            let name: Vec<u16> = dll.encode_utf16().chain(std::iter::once(0)).collect();
            // SAFETY: `name` is NUL-terminated and outlives the call.
            let module = unsafe { LoadLibraryW(name.as_ptr()) };
            if module.is_null() {
                continue;
            }

            // SAFETY: procedure names are NUL-terminated; signatures match xinput.h.
            let (state, caps) = unsafe {
                (
                    GetProcAddress(module, b"XInputGetState\0".as_ptr()),
                    GetProcAddress(module, b"XInputGetCapabilities\0".as_ptr()),
                )
            };
            match (state, caps) {
                (Some(state), Some(caps)) => {
                    info!("[XINPUT/LOAD] using {dll}");
                    return Ok(Self {
                        module,
                        get_state: unsafe { std::mem::transmute(state) },
                        get_capabilities: unsafe { std::mem::transmute(caps) },
                    });
                }
                _ => {
                    debug!("[XINPUT/LOAD] {dll} lacks the required exports");
                    unsafe { FreeLibrary(module) };
                }
            }
        }
        Err(Error::BackendUnavailable { backend: "XInput" })
    }
}

impl Drop for XInput {
    fn drop(&mut self) {
        // SAFETY: the module was loaded by `load` and is freed once.
        unsafe { FreeLibrary(self.module) };
    }
}

fn check(call: &'static str, code: u32) -> Result<(), BackendError> {
    match code {
        ERROR_SUCCESS => Ok(()),
        ERROR_DEVICE_NOT_CONNECTED => Err(BackendError::NotConnected),
        code => Err(BackendError::Native { call, code }),
    }
}

impl SlotBackend for XInput {
    fn capabilities(&mut self, slot: u32) -> Result<SlotCapabilities, BackendError> {
        // FFI struct: must be manually zeroed
        let mut caps: XINPUT_CAPABILITIES = unsafe { std::mem::zeroed() };
        // SAFETY: `caps` is a valid out-pointer of the documented layout.
        check("XInputGetCapabilities", unsafe {
            (self.get_capabilities)(slot, 0, &mut caps)
        })?;
        Ok(SlotCapabilities {
            subtype: caps.SubType,
            flags: caps.Flags,
        })
    }

    fn state(&mut self, slot: u32) -> Result<SlotState, BackendError> {
        let mut state: XINPUT_STATE = unsafe { std::mem::zeroed() };
        // SAFETY: `state` is a valid out-pointer of the documented layout.
        check("XInputGetState", unsafe { (self.get_state)(slot, &mut state) })?;
        let pad = state.Gamepad;
        Ok(SlotState {
            packet_number: state.dwPacketNumber,
            buttons: pad.wButtons,
            left_trigger: pad.bLeftTrigger,
            right_trigger: pad.bRightTrigger,
            thumb_lx: pad.sThumbLX,
            thumb_ly: pad.sThumbLY,
            thumb_rx: pad.sThumbRX,
            thumb_ry: pad.sThumbRY,
        })
    }
}
