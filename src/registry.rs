//! Device registry: stable logical handles over per-device adapters.
//!
//! Entries are created by discovery and removed by [`Gamepads::update`] when their
//! adapter reports a disconnect or a hard poll failure. An entry's name and
//! fingerprint never change after insertion, and an entry never switches backend.
//!
//! Handles are small integers. A new entry takes the lowest free handle, so a
//! handle may be reused after its device is removed.

use crate::backends::SlotBackend;
use crate::device::{NativeGamepad, PollOutcome};
use crate::error::Error;
use crate::event::{GamepadEvent, HatState};
use crate::fingerprint::Fingerprint;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Stable logical handle of a registry entry.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GamepadId(pub u32);

impl fmt::Display for GamepadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gamepad#{}", self.0)
    }
}

/// One registry entry.
#[derive(Debug)]
pub struct Gamepad {
    id: GamepadId,
    name: String,
    fingerprint: Fingerprint,
    native: NativeGamepad,
}

impl Gamepad {
    #[inline]
    pub fn id(&self) -> GamepadId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// The adapter, for backend-specific queries.
    #[inline]
    pub fn native(&self) -> &NativeGamepad {
        &self.native
    }

    pub fn axis_count(&self) -> usize {
        self.native.axis_count()
    }

    pub fn button_count(&self) -> usize {
        self.native.button_count()
    }

    pub fn hat_count(&self) -> usize {
        self.native.hat_count()
    }

    pub fn axis_value(&self, axis: usize) -> f64 {
        self.native.axis_value(axis)
    }

    pub fn is_button_pressed(&self, button: usize) -> bool {
        self.native.is_button_pressed(button)
    }

    pub fn hat_state(&self, hat: usize) -> HatState {
        self.native.hat_state(hat)
    }

    pub fn vibrate(&mut self, duration: Duration, strong_magnitude: f64, weak_magnitude: f64) {
        self.native.vibrate(duration, strong_magnitude, weak_magnitude);
    }
}

/// All known gamepads, ordered by handle.
#[derive(Debug, Default)]
pub struct Gamepads {
    entries: Vec<Gamepad>,
    events: Vec<GamepadEvent>,
}

impl Gamepads {
    pub fn new() -> Self {
        Self::default()
    }

    /// First entry matching `pred`.
    pub fn find<P>(&self, mut pred: P) -> Option<&Gamepad>
    where
        P: FnMut(&Gamepad) -> bool,
    {
        self.entries.iter().find(|g| pred(g))
    }

    pub fn get(&self, id: GamepadId) -> Option<&Gamepad> {
        self.entries.iter().find(|g| g.id == id)
    }

    pub fn get_mut(&mut self, id: GamepadId) -> Option<&mut Gamepad> {
        self.entries.iter_mut().find(|g| g.id == id)
    }

    /// Insert a new entry under the lowest free handle.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        fingerprint: Fingerprint,
        native: NativeGamepad,
    ) -> GamepadId {
        // Entries are sorted by id, so the first gap is the lowest free handle.
        let pos = self
            .entries
            .iter()
            .enumerate()
            .position(|(i, g)| g.id.0 != i as u32)
            .unwrap_or(self.entries.len());
        let id = GamepadId(pos as u32);
        let name = name.into();

        info!("[GAMEPAD/CONNECT] {id} name={name:?} fp={fingerprint}");
        self.events.push(GamepadEvent::Connected {
            id,
            name: name.clone(),
        });
        self.entries.insert(
            pos,
            Gamepad {
                id,
                name,
                fingerprint,
                native,
            },
        );
        id
    }

    /// Remove every entry matching `pred`. Returns the number removed.
    pub fn remove<P>(&mut self, mut pred: P) -> usize
    where
        P: FnMut(&Gamepad) -> bool,
    {
        let before = self.entries.len();
        let events = &mut self.events;
        self.entries.retain(|g| {
            if !pred(g) {
                return true;
            }
            info!("[GAMEPAD/DISCONNECT] {} name={:?}", g.id, g.name);
            events.push(GamepadEvent::Disconnected { id: g.id });
            false
        });
        before - self.entries.len()
    }

    /// Poll every adapter once.
    ///
    /// Disconnected devices are removed silently. A device whose poll fails with
    /// any other error is removed as well, the remaining devices are still polled,
    /// and the first such error is returned.
    pub fn update(
        &mut self,
        mut slots: Option<&mut (dyn SlotBackend + 'static)>,
    ) -> Result<(), Error> {
        let mut first_err = None;
        let events = &mut self.events;

        self.entries.retain_mut(|g| {
            match g.native.poll(slots.as_deref_mut()) {
                Ok(PollOutcome::Connected) => return true,
                Ok(PollOutcome::Disconnected) => {
                    info!("[GAMEPAD/DISCONNECT] {} name={:?}", g.id, g.name);
                }
                Err(source) => {
                    warn!("[GAMEPAD/POLL] {} failed: {source}; removing", g.id);
                    first_err.get_or_insert(Error::Poll { id: g.id, source });
                }
            }
            events.push(GamepadEvent::Disconnected { id: g.id });
            false
        });

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Gamepad> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Gamepad> {
        self.entries.iter_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take the connect/disconnect events recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<GamepadEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SlotPad;
    use crate::error::BackendError;
    use crate::testing::FakeHost;

    fn slot_entry(reg: &mut Gamepads, slot: u32) -> GamepadId {
        reg.add(
            format!("pad {slot}"),
            Fingerprint::for_slot(1),
            NativeGamepad::Slot(SlotPad::new(slot)),
        )
    }

    #[test]
    fn add_assigns_lowest_free_handle() {
        let mut reg = Gamepads::new();
        let a = slot_entry(&mut reg, 0);
        let b = slot_entry(&mut reg, 1);
        let c = slot_entry(&mut reg, 2);
        assert_eq!((a, b, c), (GamepadId(0), GamepadId(1), GamepadId(2)));

        assert_eq!(reg.remove(|g| g.id() == b), 1);
        let d = slot_entry(&mut reg, 3);
        assert_eq!(d, GamepadId(1));
        let ids: Vec<_> = reg.iter().map(Gamepad::id).collect();
        assert_eq!(ids, vec![GamepadId(0), GamepadId(1), GamepadId(2)]);
    }

    #[test]
    fn find_matches_by_backend_key() {
        let mut reg = Gamepads::new();
        slot_entry(&mut reg, 0);
        slot_entry(&mut reg, 3);
        let found = reg.find(|g| g.native().slot_index() == Some(3)).unwrap();
        assert_eq!(found.name(), "pad 3");
        assert!(reg.find(|g| g.native().slot_index() == Some(1)).is_none());
    }

    #[test]
    fn events_are_recorded_and_drained() {
        let mut reg = Gamepads::new();
        let id = slot_entry(&mut reg, 0);
        reg.remove(|_| true);
        assert_eq!(
            reg.drain_events(),
            vec![
                GamepadEvent::Connected {
                    id,
                    name: "pad 0".into()
                },
                GamepadEvent::Disconnected { id },
            ]
        );
        assert!(reg.drain_events().is_empty());
    }

    #[test]
    fn update_removes_only_the_disconnected_device() {
        let host = FakeHost::new();
        host.connect_slot(0, 0x01, 0);
        host.connect_slot(1, 0x01, 0);
        let mut reg = Gamepads::new();
        slot_entry(&mut reg, 0);
        slot_entry(&mut reg, 1);

        let mut slots = host.slot_backend();
        reg.update(Some(&mut slots)).unwrap();
        assert_eq!(reg.len(), 2);

        host.disconnect_slot(0);
        reg.update(Some(&mut slots)).unwrap();
        assert_eq!(reg.len(), 1);
        assert!(reg.iter().all(|g| g.native().slot_index() == Some(1)));
    }

    #[test]
    fn hard_poll_failure_removes_entry_and_keeps_polling_others() {
        let host = FakeHost::new();
        host.connect_slot(0, 0x01, 0);
        host.connect_slot(1, 0x01, 0);
        let mut reg = Gamepads::new();
        let bad = slot_entry(&mut reg, 0);
        slot_entry(&mut reg, 1);

        let fault = BackendError::Native {
            call: "XInputGetState",
            code: 0x1f,
        };
        host.fail_slot_state(0, fault);
        host.set_slot_state(
            1,
            crate::backends::SlotState {
                packet_number: 9,
                ..Default::default()
            },
        );

        let mut slots = host.slot_backend();
        let err = reg.update(Some(&mut slots)).unwrap_err();
        assert_eq!(
            err,
            Error::Poll {
                id: bad,
                source: fault
            }
        );
        assert_eq!(reg.len(), 1);
        assert_eq!(host.slot_state_calls(1), 1);

        // Not sticky: the next tick is clean.
        reg.update(Some(&mut slots)).unwrap();
    }

    #[test]
    fn gamepad_id_display_and_serde() {
        assert_eq!(GamepadId(4).to_string(), "gamepad#4");
        assert_eq!(serde_json::to_string(&GamepadId(4)).unwrap(), "4");
    }
}
