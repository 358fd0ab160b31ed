//! Subsystem configuration.
//!
//! [`GamepadConfig`] selects which native backends are loaded and tunes discovery.
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! joystick_api = true
//! slot_api = true
//! slot_count = 4
//! claimed_name_infix = "IG_"
//! ```

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum number of slots the simplified controller API exposes.
pub const MAX_SLOTS: u32 = 4;

/// Runtime configuration for [`NativeGamepads`](crate::native::NativeGamepads).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadConfig {
    /// Load the generic joystick enumeration backend (DirectInput on Windows).
    pub joystick_api: bool,

    /// Load the slot-based controller backend (XInput on Windows).
    pub slot_api: bool,

    /// Number of slots probed per discovery pass (`1..=4`).
    pub slot_count: u32,

    /// Raw HID device-name infix that marks a device as owned by the slot API.
    ///
    /// A joystick whose vendor/product matches a raw HID device with this infix in
    /// its name is skipped, because the slot backend already serves it.
    pub claimed_name_infix: String,
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            joystick_api: true,
            slot_api: true,
            slot_count: MAX_SLOTS,
            claimed_name_infix: "IG_".to_string(),
        }
    }
}

impl GamepadConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), Error> {
        if self.slot_count == 0 || self.slot_count > MAX_SLOTS {
            return Err(Error::Config(format!(
                "slot_count must be in 1..={MAX_SLOTS}, got {}",
                self.slot_count
            )));
        }
        if self.claimed_name_infix.is_empty() {
            return Err(Error::Config("claimed_name_infix must not be empty".into()));
        }
        Ok(())
    }
}
