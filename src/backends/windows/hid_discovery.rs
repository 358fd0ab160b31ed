//! Raw HID listing via `hidapi`.
//!
//! The arbiter compares this list against DirectInput instances to find controllers
//! that XInput already serves. Only entries that could be game controls are
//! returned; plain mouse and keyboard endpoints on Generic Desktop are dropped.
//!
//! The `HidApi` context is created on first use and refreshed on every later call,
//! so one discovery pass costs a single enumeration.

#![cfg(target_os = "windows")]

use crate::backends::RawHidDevice;
use crate::error::BackendError;
use hidapi::{DeviceInfo, HidApi};
use log::{debug, warn};
use windows_sys::Win32::Foundation::GetLastError;

/// Lazily created `hidapi` context.
#[derive(Default)]
pub struct RawHidList {
    api: Option<HidApi>,
}

impl RawHidList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current HID device list, filtered to candidate game controls.
    pub fn list(&mut self) -> Result<Vec<RawHidDevice>, BackendError> {
        let api = match self.api.take() {
            Some(mut api) => {
                api.refresh_devices()
                    .map_err(|e| hid_failure("refresh_devices", e))?;
                api
            }
            None => HidApi::new().map_err(|e| hid_failure("HidApi::new", e))?,
        };
        let api = self.api.insert(api);

        let out: Vec<RawHidDevice> = api
            .device_list()
            .filter(|info| is_game_control(info))
            .map(|info| RawHidDevice {
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                name: info.path().to_string_lossy().into_owned(),
            })
            .collect();
        debug!("[HID/LIST] {} candidate device(s)", out.len());
        Ok(out)
    }
}

/// hidapi's Windows backend reports failures through the thread's last-error code;
/// the message itself only reaches the log.
fn hid_failure(call: &'static str, err: hidapi::HidError) -> BackendError {
    // SAFETY: no preconditions.
    let code = unsafe { GetLastError() };
    warn!("[HID/LIST] {call} failed (code {code:#x}): {err}");
    BackendError::Native { call, code }
}

/// Usage pages that carry game controls: Generic Desktop, Simulation, Physical
/// Interface, vendor-defined. Mouse (0x02) and keyboard (0x06) are rejected.
fn is_game_control(info: &DeviceInfo) -> bool {
    let page = info.usage_page();
    let usage = info.usage();
    match page {
        0x01 => !matches!(usage, 0x02 | 0x06),
        0x02 | 0x0F => true,
        p => p & 0xFF00 == 0xFF00,
    }
}
