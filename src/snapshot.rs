//! Per-tick snapshot of gamepad states.
//!
//! [`Snapshot`] is an **owned**, read-only copy of every registered gamepad at one
//! point in time (typically "this tick"). It is produced by
//! [`Manager::snapshot`](crate::manager::Manager::snapshot) after
//! [`Manager::update`](crate::manager::Manager::update) and can be cloned for fan-out
//! or serialized for logging.
//!
//! # Semantics
//! - Keys are [`GamepadId`]s, in handle order.
//! - A snapshot never polls. It reflects the state after the last update.
//!
//! # Examples
//! ```no_run
//! use padbridge::Snapshot;
//!
//! fn print_sticks(snap: &Snapshot) {
//!     for (id, pad) in snap.iter() {
//!         println!("{id} {}: x={:.2} y={:.2}", pad.name, pad.axis(0), pad.axis(1));
//!     }
//! }
//! ```

use crate::event::HatState;
use crate::fingerprint::Fingerprint;
use crate::registry::{Gamepad, GamepadId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Values of one gamepad at snapshot time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GamepadState {
    pub name: String,
    pub fingerprint: Fingerprint,
    pub axes: Vec<f64>,
    pub buttons: Vec<bool>,
    pub hats: Vec<HatState>,
}

impl GamepadState {
    pub fn capture(pad: &Gamepad) -> Self {
        Self {
            name: pad.name().to_string(),
            fingerprint: *pad.fingerprint(),
            axes: (0..pad.axis_count()).map(|i| pad.axis_value(i)).collect(),
            buttons: (0..pad.button_count())
                .map(|i| pad.is_button_pressed(i))
                .collect(),
            hats: (0..pad.hat_count()).map(|i| pad.hat_state(i)).collect(),
        }
    }

    /// Axis value, `0.0` when out of range.
    #[inline]
    pub fn axis(&self, i: usize) -> f64 {
        self.axes.get(i).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn button(&self, i: usize) -> bool {
        self.buttons.get(i).copied().unwrap_or(false)
    }

    #[inline]
    pub fn hat(&self, i: usize) -> HatState {
        self.hats.get(i).copied().unwrap_or_default()
    }
}

/// Owned snapshot (`GamepadId → GamepadState`).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot(pub BTreeMap<GamepadId, GamepadState>);

impl Snapshot {
    pub fn capture<'a>(pads: impl IntoIterator<Item = &'a Gamepad>) -> Self {
        Self(
            pads.into_iter()
                .map(|pad| (pad.id(), GamepadState::capture(pad)))
                .collect(),
        )
    }

    #[inline]
    pub fn get(&self, id: GamepadId) -> Option<&GamepadState> {
        self.0.get(&id)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&GamepadId, &GamepadState)> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn into_inner(self) -> BTreeMap<GamepadId, GamepadState> {
        self.0
    }
}
