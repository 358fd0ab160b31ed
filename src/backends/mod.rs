//! Native input backends for `padbridge`.
//!
//! Two structurally different native APIs sit behind the traits in this module:
//!
//! - [`JoystickBackend`] / [`JoystickDevice`]: a generic enumeration API (DirectInput 8
//!   on Windows). Many heterogeneous devices; each one is asked for its objects
//!   (axes, sliders, POVs, buttons) and polled into a fixed [`JoyState`] report.
//! - [`SlotBackend`]: a simplified controller API (XInput on Windows). A handful of
//!   numbered slots; one call returns a fixed-shape [`SlotState`].
//!
//! The arbiter ([`NativeGamepads`](crate::native::NativeGamepads)) only talks to these
//! traits, so discovery, deduplication and polling run the same against the real
//! Win32 implementations and the fakes used in tests.
//!
//! # Feature flags
//! - **`native`** (default): builds the Windows implementations in [`windows`].
//!
//! All backend calls are thread-affine: they must run on the thread that owns the
//! host window. None of these traits require `Send`.

use crate::error::BackendError;

#[cfg(all(feature = "native", target_os = "windows"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "native", target_os = "windows"))))]
pub mod windows;

/// Number of true axes in the joystick report (X, Y, Z, Rx, Ry, Rz).
pub const MAX_AXES: usize = 6;
/// Number of sliders in the joystick report.
pub const MAX_SLIDERS: usize = 2;
/// Number of POV hats in the joystick report.
pub const MAX_POVS: usize = 4;
/// Number of buttons in the joystick report.
pub const MAX_BUTTONS: usize = 32;

/// POV reading meaning "centered". Only the low word is significant.
pub const POV_CENTERED: u32 = 0xFFFF_FFFF;

/// Canonical logical range every axis-like object is configured to.
pub const AXIS_MIN: i32 = -32768;
pub const AXIS_MAX: i32 = 32767;

/// A COM-style 128-bit identifier, laid out like the Win32 `GUID`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn from_u128(v: u128) -> Self {
        Self {
            data1: (v >> 96) as u32,
            data2: (v >> 80 & 0xffff) as u16,
            data3: (v >> 64 & 0xffff) as u16,
            data4: (v as u64).to_be_bytes(),
        }
    }
}

/// One device reported by [`JoystickBackend::enumerate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInstance {
    /// Unique per physical device instance. Deduplication key.
    pub instance_guid: Guid,
    /// Identifies the product; may carry vendor/product ids (see [`crate::fingerprint`]).
    pub product_guid: Guid,
    /// Human-readable instance name.
    pub name: String,
}

/// What kind of object a device reports, by its type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectType {
    XAxis,
    YAxis,
    ZAxis,
    RxAxis,
    RyAxis,
    RzAxis,
    Slider,
    Button,
    Pov,
    /// Axis-class object with an unknown type tag, or anything else unexpected.
    Unknown,
}

impl ObjectType {
    /// Position of a true axis in [`JoyState::axes`].
    pub fn axis_slot(self) -> Option<usize> {
        match self {
            ObjectType::XAxis => Some(0),
            ObjectType::YAxis => Some(1),
            ObjectType::ZAxis => Some(2),
            ObjectType::RxAxis => Some(3),
            ObjectType::RyAxis => Some(4),
            ObjectType::RzAxis => Some(5),
            _ => None,
        }
    }
}

/// One object reported by [`JoystickDevice::objects`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceObject {
    pub object_type: ObjectType,
    /// Backend-specific object id, handed back to [`JoystickDevice::set_axis_range`].
    pub id: u32,
}

/// Raw joystick report in the negotiated layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoyState {
    /// X, Y, Z, Rx, Ry, Rz in the canonical signed 16-bit range.
    pub axes: [i32; MAX_AXES],
    pub sliders: [i32; MAX_SLIDERS],
    /// Hundredths of a degree clockwise from north, or [`POV_CENTERED`].
    pub povs: [u32; MAX_POVS],
    /// Pressed when the high bit (0x80) is set.
    pub buttons: [u8; MAX_BUTTONS],
}

impl Default for JoyState {
    fn default() -> Self {
        Self {
            axes: [0; MAX_AXES],
            sliders: [0; MAX_SLIDERS],
            povs: [POV_CENTERED; MAX_POVS],
            buttons: [0; MAX_BUTTONS],
        }
    }
}

/// A raw HID device as listed by the OS.
///
/// Used only for the "already served by the slot API" check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawHidDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    /// OS device name / interface path.
    pub name: String,
}

/// Generic enumeration API (Backend A).
pub trait JoystickBackend {
    /// List every attached game-controller-class device.
    fn enumerate(&mut self) -> Result<Vec<DeviceInstance>, BackendError>;

    /// Open a device for configuration and polling.
    fn create_device(
        &mut self,
        instance: &DeviceInstance,
    ) -> Result<Box<dyn JoystickDevice>, BackendError>;

    /// List raw HID devices for the slot-API ownership check.
    fn raw_hid_devices(&mut self) -> Result<Vec<RawHidDevice>, BackendError>;
}

/// An opened Backend A device.
pub trait JoystickDevice {
    /// Negotiate the fixed [`JoyState`] report layout.
    fn set_report_layout(&mut self) -> Result<(), BackendError>;

    /// Report axes as absolute positions.
    fn set_absolute_axis_mode(&mut self) -> Result<(), BackendError>;

    /// Enumerate the objects actually present, in device order.
    fn objects(&mut self) -> Result<Vec<DeviceObject>, BackendError>;

    /// Set the logical range of one axis-like object.
    fn set_axis_range(
        &mut self,
        object: &DeviceObject,
        min: i32,
        max: i32,
    ) -> Result<(), BackendError>;

    /// Acquire access. Re-acquiring an acquired device succeeds.
    fn acquire(&mut self) -> Result<(), BackendError>;

    /// Ask the device for a fresh report.
    fn poll(&mut self) -> Result<(), BackendError>;

    /// Read the most recent report.
    fn read_state(&mut self) -> Result<JoyState, BackendError>;
}

/// Capabilities reported for an occupied slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotCapabilities {
    /// Device subtype byte (gamepad, wheel, arcade stick, ...).
    pub subtype: u8,
    /// Capability flags (bit 0x0002 = wireless).
    pub flags: u16,
}

/// Fixed-shape slot report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotState {
    pub packet_number: u32,
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

/// Simplified controller API (Backend B).
pub trait SlotBackend {
    /// Capabilities of the controller in `slot`, or `NotConnected` for an empty slot.
    fn capabilities(&mut self, slot: u32) -> Result<SlotCapabilities, BackendError>;

    /// Current report for `slot`, or `NotConnected` once the controller is gone.
    fn state(&mut self, slot: u32) -> Result<SlotState, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_from_u128_matches_win32_layout() {
        let g = Guid::from_u128(0xa36d02e0_c9f3_11cf_bfc7_444553540000);
        assert_eq!(g.data1, 0xa36d02e0);
        assert_eq!(g.data2, 0xc9f3);
        assert_eq!(g.data3, 0x11cf);
        assert_eq!(g.data4, [0xbf, 0xc7, 0x44, 0x45, 0x53, 0x54, 0x00, 0x00]);
    }

    #[test]
    fn default_report_is_neutral() {
        let s = JoyState::default();
        assert!(s.povs.iter().all(|&p| p == POV_CENTERED));
        assert!(s.buttons.iter().all(|&b| b == 0));
    }

    #[test]
    fn only_true_axes_have_axis_slots() {
        assert_eq!(ObjectType::XAxis.axis_slot(), Some(0));
        assert_eq!(ObjectType::RzAxis.axis_slot(), Some(5));
        assert_eq!(ObjectType::Slider.axis_slot(), None);
        assert_eq!(ObjectType::Unknown.axis_slot(), None);
    }
}
