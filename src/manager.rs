//! Per-tick facade over the arbiter and the registry.
//!
//! The host calls [`Manager::update`] once per input tick on the window thread, then
//! reads state through [`Manager::gamepads`] or an owned [`Manager::snapshot`].
//!
//! ```no_run
//! # #[cfg(all(feature = "native", target_os = "windows"))]
//! # fn main() -> Result<(), padbridge::Error> {
//! use padbridge::{GamepadConfig, Manager};
//!
//! let mut manager = Manager::discover(GamepadConfig::default())?;
//! loop {
//!     manager.update()?;
//!     for pad in manager.gamepads().iter() {
//!         println!("{} {} x={:.2}", pad.id(), pad.name(), pad.axis_value(0));
//!     }
//! #   break;
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(all(feature = "native", target_os = "windows")))]
//! # fn main() {}
//! ```

use crate::config::GamepadConfig;
use crate::error::Error;
use crate::event::GamepadEvent;
use crate::native::NativeGamepads;
use crate::registry::{Gamepad, GamepadId, Gamepads};
use crate::snapshot::Snapshot;

pub struct Manager {
    // Devices are dropped before the backends that created them.
    gamepads: Gamepads,
    native: NativeGamepads,
}

impl Manager {
    /// Wrap an arbiter. Call [`initialize`](Self::initialize) before the first tick.
    pub fn new(native: NativeGamepads) -> Self {
        Self {
            native,
            gamepads: Gamepads::new(),
        }
    }

    /// Load the Win32 backends and run initial discovery.
    #[cfg(all(feature = "native", target_os = "windows"))]
    pub fn discover(config: GamepadConfig) -> Result<Self, Error> {
        let mut manager = Self::new(NativeGamepads::load(config)?);
        manager.initialize()?;
        Ok(manager)
    }

    /// Initial discovery.
    pub fn initialize(&mut self) -> Result<(), Error> {
        self.native.initialize(&mut self.gamepads)
    }

    /// One input tick: hook and hot-plug housekeeping, then poll every device.
    pub fn update(&mut self) -> Result<(), Error> {
        self.native.update(&mut self.gamepads)?;
        self.gamepads.update(self.native.slot_backend_mut())
    }

    #[inline]
    pub fn config(&self) -> &GamepadConfig {
        self.native.config()
    }

    #[inline]
    pub fn gamepads(&self) -> &Gamepads {
        &self.gamepads
    }

    #[inline]
    pub fn gamepad(&self, id: GamepadId) -> Option<&Gamepad> {
        self.gamepads.get(id)
    }

    #[inline]
    pub fn gamepad_mut(&mut self, id: GamepadId) -> Option<&mut Gamepad> {
        self.gamepads.get_mut(id)
    }

    #[inline]
    pub fn native(&self) -> &NativeGamepads {
        &self.native
    }

    #[inline]
    pub fn native_mut(&mut self) -> &mut NativeGamepads {
        &mut self.native
    }

    /// Owned copy of every gamepad's current values.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.gamepads.iter())
    }

    /// Connect/disconnect events since the last call.
    pub fn drain_events(&mut self) -> Vec<GamepadEvent> {
        self.gamepads.drain_events()
    }
}
