//! Hats and registry events.
//!
//! ## Value conventions
//! - **Axes:** `f64`, normalized to roughly `[-1.0, 1.0]`
//!   (see [`normalize_axis`](crate::capability::normalize_axis)).
//! - **Buttons:** `bool`, pressed or not.
//! - **Hats (POV/D-pad):** [`HatState`], centered or one of 8 directions.
//!
//! `HatState` can be projected onto the two conventions downstream code tends to use:
//! - [`HatState::slot`]: `-1` = neutral, `0..7` = directions (Up = 0, clockwise).
//! - [`HatState::bits`]: up = 1, right = 2, down = 4, left = 8, diagonals OR'ed.

use crate::registry::GamepadId;
use serde::{Deserialize, Serialize};

/// Position of an 8-way hat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HatState {
    #[default]
    Centered,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl HatState {
    /// Directions in clockwise order starting at Up. Index = slot value.
    pub const DIRECTIONS: [HatState; 8] = [
        HatState::Up,
        HatState::UpRight,
        HatState::Right,
        HatState::DownRight,
        HatState::Down,
        HatState::DownLeft,
        HatState::Left,
        HatState::UpLeft,
    ];

    /// Direction for a clockwise slot index; anything outside `0..8` is centered.
    #[inline]
    pub fn from_slot(slot: u32) -> Self {
        usize::try_from(slot)
            .ok()
            .and_then(|i| Self::DIRECTIONS.get(i).copied())
            .unwrap_or(HatState::Centered)
    }

    /// Build a hat from four D-pad bits.
    ///
    /// Conflicting input (up+down or left+right) is reported as centered.
    pub fn from_dpad(up: bool, down: bool, left: bool, right: bool) -> Self {
        match (up, down, left, right) {
            (true, false, false, false) => HatState::Up,
            (true, false, false, true) => HatState::UpRight,
            (false, false, false, true) => HatState::Right,
            (false, true, false, true) => HatState::DownRight,
            (false, true, false, false) => HatState::Down,
            (false, true, true, false) => HatState::DownLeft,
            (false, false, true, false) => HatState::Left,
            (true, false, true, false) => HatState::UpLeft,
            _ => HatState::Centered,
        }
    }

    /// `-1` for centered, `0..7` clockwise from Up.
    pub fn slot(self) -> i16 {
        match self {
            HatState::Centered => -1,
            HatState::Up => 0,
            HatState::UpRight => 1,
            HatState::Right => 2,
            HatState::DownRight => 3,
            HatState::Down => 4,
            HatState::DownLeft => 5,
            HatState::Left => 6,
            HatState::UpLeft => 7,
        }
    }

    /// Up = 1, right = 2, down = 4, left = 8.
    pub fn bits(self) -> u8 {
        const UP: u8 = 1;
        const RIGHT: u8 = 2;
        const DOWN: u8 = 4;
        const LEFT: u8 = 8;
        match self {
            HatState::Centered => 0,
            HatState::Up => UP,
            HatState::UpRight => UP | RIGHT,
            HatState::Right => RIGHT,
            HatState::DownRight => DOWN | RIGHT,
            HatState::Down => DOWN,
            HatState::DownLeft => DOWN | LEFT,
            HatState::Left => LEFT,
            HatState::UpLeft => UP | LEFT,
        }
    }

    #[inline]
    pub fn is_centered(self) -> bool {
        self == HatState::Centered
    }
}

/// Registry membership change, recorded as devices come and go.
///
/// Drained with [`Gamepads::drain_events`](crate::registry::Gamepads::drain_events).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GamepadEvent {
    /// A device was discovered and added under `id`.
    Connected { id: GamepadId, name: String },
    /// The device under `id` was removed (unplugged or failed).
    Disconnected { id: GamepadId },
}
