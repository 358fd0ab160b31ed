//! # padbridge
//!
//! Gamepad input over two native controller APIs, unified into one logical
//! [`Gamepad`] with normalized axes, buttons and hats.
//!
//! - The **joystick API** (DirectInput 8 on Windows) serves arbitrary game
//!   controllers. Each device's objects are walked once to build its layout.
//! - The **slot API** (XInput on Windows) serves up to four Xbox-family controllers
//!   with a fixed layout.
//!
//! A device the slot API already serves is not registered a second time through the
//! joystick API. Every gamepad carries an SDL-style [`Fingerprint`] for
//! controller-mapping lookups downstream.
//!
//! ## Value conventions
//! - **Axes:** `f64`, roughly `[-1.0, 1.0]`.
//! - **Buttons:** `bool`.
//! - **Hats:** [`HatState`], centered or one of 8 directions.
//!
//! ## Threading
//! All discovery and polling run on the thread that owns the host window. The only
//! cross-context signal is the device-change flag set from the window procedure.
//!
//! ## Feature flags
//! - **`native`** (default): Win32 backends (DirectInput, XInput, hidapi, window hook).
//!   Without it, or off Windows, backends are supplied through the traits in
//!   [`backends`].

pub mod backends;
pub mod capability;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod hotplug;
pub mod manager;
pub mod native;
pub mod registry;
pub mod snapshot;

#[cfg(test)]
mod testing;

pub use config::GamepadConfig;
pub use device::{NativeGamepad, PollOutcome};
pub use error::{BackendError, Error};
pub use event::{GamepadEvent, HatState};
pub use fingerprint::Fingerprint;
pub use hotplug::{DeviceChangeNotifier, MessageHook};
pub use manager::Manager;
pub use native::NativeGamepads;
pub use registry::{Gamepad, GamepadId, Gamepads};
pub use snapshot::{GamepadState, Snapshot};
