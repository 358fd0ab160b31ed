//! Per-device adapter.
//!
//! A [`NativeGamepad`] wraps exactly one physical device from one backend:
//!
//! - [`JoystickPad`]: an opened joystick-API device plus the [`Capabilities`] found at
//!   insertion, and normalized axis/button/hat buffers refreshed on every poll.
//! - [`SlotPad`]: a slot index plus the last raw [`SlotState`]; values are normalized
//!   on read.
//!
//! # Conventions
//! Both variants answer the same queries. Out-of-range indices return the neutral
//! value (`0.0`, `false`, [`HatState::Centered`]).
//!
//! ## Slot layout
//! - Axes (6): `0` LX, `1` LY inverted, `2` RX, `3` RY inverted, `4` LT, `5` RT.
//!   Triggers map `0..=255` onto `[-1, 1]`.
//! - Buttons (10): A, B, X, Y, LB, RB, Back, Start, LThumb, RThumb.
//! - Hat (1): the D-pad.

use crate::backends::{Guid, JoyState, JoystickDevice, SlotBackend, SlotState};
use crate::capability::{self, Capabilities};
use crate::error::{BackendError, Error};
use crate::event::HatState;
use log::trace;
use std::fmt;
use std::time::Duration;

/// Slot report button bits.
pub mod slot_buttons {
    pub const DPAD_UP: u16 = 0x0001;
    pub const DPAD_DOWN: u16 = 0x0002;
    pub const DPAD_LEFT: u16 = 0x0004;
    pub const DPAD_RIGHT: u16 = 0x0008;
    pub const START: u16 = 0x0010;
    pub const BACK: u16 = 0x0020;
    pub const LEFT_THUMB: u16 = 0x0040;
    pub const RIGHT_THUMB: u16 = 0x0080;
    pub const LEFT_SHOULDER: u16 = 0x0100;
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    pub const A: u16 = 0x1000;
    pub const B: u16 = 0x2000;
    pub const X: u16 = 0x4000;
    pub const Y: u16 = 0x8000;
}

/// Exposed slot button index → report bit.
const SLOT_BUTTONS: [u16; 10] = [
    slot_buttons::A,
    slot_buttons::B,
    slot_buttons::X,
    slot_buttons::Y,
    slot_buttons::LEFT_SHOULDER,
    slot_buttons::RIGHT_SHOULDER,
    slot_buttons::BACK,
    slot_buttons::START,
    slot_buttons::LEFT_THUMB,
    slot_buttons::RIGHT_THUMB,
];

const SLOT_AXES: usize = 6;
const SLOT_HATS: usize = 1;

/// Result of one successful poll call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Fresh state is available.
    Connected,
    /// The device is gone; the caller removes its entry.
    Disconnected,
}

/// One physical device, from exactly one backend.
pub enum NativeGamepad {
    Joystick(JoystickPad),
    Slot(SlotPad),
}

impl NativeGamepad {
    /// Refresh state from the backend.
    ///
    /// `slots` is the slot backend; joystick devices ignore it. A slot device polled
    /// without a slot backend reports [`PollOutcome::Disconnected`].
    pub fn poll(
        &mut self,
        slots: Option<&mut (dyn SlotBackend + 'static)>,
    ) -> Result<PollOutcome, BackendError> {
        match self {
            NativeGamepad::Joystick(pad) => pad.poll(),
            NativeGamepad::Slot(pad) => match slots {
                Some(backend) => pad.poll(backend),
                None => Ok(PollOutcome::Disconnected),
            },
        }
    }

    pub fn axis_count(&self) -> usize {
        match self {
            NativeGamepad::Joystick(pad) => pad.axes.len(),
            NativeGamepad::Slot(_) => SLOT_AXES,
        }
    }

    pub fn button_count(&self) -> usize {
        match self {
            NativeGamepad::Joystick(pad) => pad.buttons.len(),
            NativeGamepad::Slot(_) => SLOT_BUTTONS.len(),
        }
    }

    pub fn hat_count(&self) -> usize {
        match self {
            NativeGamepad::Joystick(pad) => pad.hats.len(),
            NativeGamepad::Slot(_) => SLOT_HATS,
        }
    }

    pub fn axis_value(&self, axis: usize) -> f64 {
        match self {
            NativeGamepad::Joystick(pad) => pad.axes.get(axis).copied().unwrap_or(0.0),
            NativeGamepad::Slot(pad) => pad.axis_value(axis),
        }
    }

    pub fn is_button_pressed(&self, button: usize) -> bool {
        match self {
            NativeGamepad::Joystick(pad) => pad.buttons.get(button).copied().unwrap_or(false),
            NativeGamepad::Slot(pad) => SLOT_BUTTONS
                .get(button)
                .is_some_and(|&mask| pad.state.buttons & mask != 0),
        }
    }

    pub fn hat_state(&self, hat: usize) -> HatState {
        match self {
            NativeGamepad::Joystick(pad) => pad.hats.get(hat).copied().unwrap_or_default(),
            NativeGamepad::Slot(pad) if hat == 0 => pad.dpad(),
            NativeGamepad::Slot(_) => HatState::Centered,
        }
    }

    /// Rumble request. Not supported by either backend; the call is accepted and dropped.
    pub fn vibrate(&mut self, duration: Duration, strong_magnitude: f64, weak_magnitude: f64) {
        trace!(
            "[GAMEPAD/VIBRATE] ignored duration={:?} strong={:.2} weak={:.2}",
            duration,
            strong_magnitude,
            weak_magnitude
        );
    }

    /// Whether the backend already reports a standard button layout.
    ///
    /// Always `false`: layout mapping is resolved downstream from the fingerprint.
    pub fn has_own_standard_layout_mapping(&self) -> bool {
        false
    }

    /// Instance GUID, for joystick devices.
    pub fn joystick_guid(&self) -> Option<&Guid> {
        match self {
            NativeGamepad::Joystick(pad) => Some(&pad.guid),
            NativeGamepad::Slot(_) => None,
        }
    }

    /// Slot index, for slot devices.
    pub fn slot_index(&self) -> Option<u32> {
        match self {
            NativeGamepad::Joystick(_) => None,
            NativeGamepad::Slot(pad) => Some(pad.index),
        }
    }
}

impl fmt::Debug for NativeGamepad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeGamepad::Joystick(pad) => f
                .debug_struct("Joystick")
                .field("guid", &pad.guid)
                .field("axes", &pad.axes.len())
                .field("buttons", &pad.buttons.len())
                .field("hats", &pad.hats.len())
                .finish(),
            NativeGamepad::Slot(pad) => f
                .debug_struct("Slot")
                .field("index", &pad.index)
                .field("packet", &pad.state.packet_number)
                .finish(),
        }
    }
}

/// Joystick-API device with its discovered layout.
pub struct JoystickPad {
    guid: Guid,
    device: Box<dyn JoystickDevice>,
    caps: Capabilities,
    axes: Vec<f64>,
    buttons: Vec<bool>,
    hats: Vec<HatState>,
}

impl JoystickPad {
    /// Run capability discovery on an opened device and size the state buffers.
    pub fn open(guid: Guid, mut device: Box<dyn JoystickDevice>) -> Result<Self, Error> {
        let caps = Capabilities::discover(device.as_mut())?;
        Ok(Self {
            guid,
            device,
            axes: vec![0.0; caps.axis_count()],
            buttons: vec![false; caps.button_count()],
            hats: vec![HatState::Centered; caps.hat_count()],
            caps,
        })
    }

    #[inline]
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Poll and read a report, with one re-acquire cycle on a transient failure.
    ///
    /// `NotConnected` at any step, or a second transient failure, is a disconnect.
    fn poll(&mut self) -> Result<PollOutcome, BackendError> {
        let state = match self.read() {
            Ok(state) => state,
            Err(e) if e.is_transient() => {
                // Acquire can fail right after an unplug; the retry below decides.
                let _ = self.device.acquire();
                match self.read() {
                    Ok(state) => state,
                    Err(e) if e.is_transient() => return Ok(PollOutcome::Disconnected),
                    Err(e) => return gone_or(e),
                }
            }
            Err(e) => return gone_or(e),
        };

        self.caps
            .apply(&state, &mut self.axes, &mut self.buttons, &mut self.hats);
        Ok(PollOutcome::Connected)
    }

    fn read(&mut self) -> Result<JoyState, BackendError> {
        match self.device.poll() {
            Err(e) if !e.is_transient() => return Err(e),
            _ => {}
        }
        self.device.read_state()
    }
}

fn gone_or(e: BackendError) -> Result<PollOutcome, BackendError> {
    match e {
        BackendError::NotConnected => Ok(PollOutcome::Disconnected),
        e => Err(e),
    }
}

/// Slot-API device.
pub struct SlotPad {
    index: u32,
    state: SlotState,
}

impl SlotPad {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            state: SlotState::default(),
        }
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn state(&self) -> &SlotState {
        &self.state
    }

    fn poll(&mut self, backend: &mut dyn SlotBackend) -> Result<PollOutcome, BackendError> {
        match backend.state(self.index) {
            Ok(state) => {
                self.state = state;
                Ok(PollOutcome::Connected)
            }
            Err(BackendError::NotConnected) => Ok(PollOutcome::Disconnected),
            Err(e) => Err(e),
        }
    }

    fn axis_value(&self, axis: usize) -> f64 {
        let s = &self.state;
        match axis {
            0 => capability::normalize_axis(i32::from(s.thumb_lx)),
            1 => -capability::normalize_axis(i32::from(s.thumb_ly)),
            2 => capability::normalize_axis(i32::from(s.thumb_rx)),
            3 => -capability::normalize_axis(i32::from(s.thumb_ry)),
            4 => capability::normalize_trigger(s.left_trigger),
            5 => capability::normalize_trigger(s.right_trigger),
            _ => 0.0,
        }
    }

    fn dpad(&self) -> HatState {
        let b = self.state.buttons;
        HatState::from_dpad(
            b & slot_buttons::DPAD_UP != 0,
            b & slot_buttons::DPAD_DOWN != 0,
            b & slot_buttons::DPAD_LEFT != 0,
            b & slot_buttons::DPAD_RIGHT != 0,
        )
    }
}
