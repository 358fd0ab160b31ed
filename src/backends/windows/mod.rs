#![cfg(target_os = "windows")]

//! Windows backends.
//!
//! - [`DirectInput`]: DirectInput 8 joysticks, plus the `hidapi` raw-HID list used to
//!   spot controllers XInput already serves
//! - [`XInput`]: the four XInput slots
//! - [`WindowHook`]: `WM_DEVICECHANGE` interception on the active window
//!
//! Both DLLs are loaded at runtime. Most hosts should go through
//! [`Manager::discover`](crate::manager::Manager::discover) instead of using these
//! directly.

pub mod directinput;
pub mod hid_discovery;
pub mod window_hook;
pub mod xinput;

pub use directinput::DirectInput;
pub use window_hook::WindowHook;
pub use xinput::XInput;
