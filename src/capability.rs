//! Per-device capability discovery and report normalization (joystick backend).
//!
//! Discovery is a one-time walk over the objects a device reports. Each object is
//! classified and recorded as a [`CapabilityDescriptor`]; the descriptor list is then
//! sorted by `(kind, index)` and drives every later poll:
//!
//! - exposed axes are the true axes (by identity X, Y, Z, Rx, Ry, Rz) followed by the
//!   sliders, so "axis N" for `N >= true_axis_count` is slider `N - true_axis_count`;
//! - buttons and hats keep their discovery order.
//!
//! The walk never reads memory by offset: each descriptor names the [`JoyState`] field
//! it comes from.

use crate::backends::{
    DeviceObject, JoyState, JoystickDevice, ObjectType, AXIS_MAX, AXIS_MIN, MAX_BUTTONS,
    MAX_POVS, MAX_SLIDERS,
};
use crate::error::{BackendError, Error};
use crate::event::HatState;
use log::{debug, warn};

/// Hundredths of a degree per hat direction (45°).
const POV_SECTOR: u32 = 4500;

/// Semantic kind of a discovered object. Declaration order is the sort order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    Axis,
    Slider,
    Button,
    Hat,
}

/// `(kind, index)` pair. For axes `index` is the axis identity (X = 0 .. Rz = 5);
/// for the other kinds it is the discovery order within that kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapabilityDescriptor {
    pub kind: ObjectKind,
    pub index: usize,
}

/// Sorted descriptor list plus per-kind counts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    descriptors: Vec<CapabilityDescriptor>,
    axes: usize,
    sliders: usize,
    buttons: usize,
    hats: usize,
}

impl Capabilities {
    /// Run the full discovery sequence against an opened device.
    ///
    /// Layout negotiation, axis mode and object enumeration failures are discovery
    /// faults. A failure to set one object's range only skips that object.
    pub fn discover(device: &mut dyn JoystickDevice) -> Result<Self, Error> {
        device
            .set_report_layout()
            .map_err(|e| Error::discovery("set the report layout", e))?;
        device
            .set_absolute_axis_mode()
            .map_err(|e| Error::discovery("set absolute axis mode", e))?;
        let objects = device
            .objects()
            .map_err(|e| Error::discovery("enumerate device objects", e))?;

        Ok(Self::from_objects(&objects, |object| {
            device.set_axis_range(object, AXIS_MIN, AXIS_MAX)
        }))
    }

    /// Classify `objects` in order.
    ///
    /// `configure_axis` is called for every axis-like object before it is accepted;
    /// objects it rejects are left out.
    pub fn from_objects<F>(objects: &[DeviceObject], mut configure_axis: F) -> Self
    where
        F: FnMut(&DeviceObject) -> Result<(), BackendError>,
    {
        let mut caps = Self::default();

        for object in objects {
            let descriptor = match object.object_type {
                ObjectType::Unknown => {
                    warn!(
                        "[CAPS/SKIP] object id={:#x}: {}",
                        object.id,
                        BackendError::UnrecognizedObject
                    );
                    continue;
                }
                ObjectType::Slider if caps.sliders >= MAX_SLIDERS => {
                    debug!("[CAPS/SKIP] slider id={:#x}: layout is full", object.id);
                    continue;
                }
                ObjectType::Button if caps.buttons >= MAX_BUTTONS => {
                    debug!("[CAPS/SKIP] button id={:#x}: layout is full", object.id);
                    continue;
                }
                ObjectType::Pov if caps.hats >= MAX_POVS => {
                    debug!("[CAPS/SKIP] pov id={:#x}: layout is full", object.id);
                    continue;
                }
                ObjectType::Button => {
                    caps.buttons += 1;
                    CapabilityDescriptor {
                        kind: ObjectKind::Button,
                        index: caps.buttons - 1,
                    }
                }
                ObjectType::Pov => {
                    caps.hats += 1;
                    CapabilityDescriptor {
                        kind: ObjectKind::Hat,
                        index: caps.hats - 1,
                    }
                }
                ObjectType::Slider => {
                    if let Err(e) = configure_axis(object) {
                        warn!("[CAPS/SKIP] slider id={:#x}: range rejected: {e}", object.id);
                        continue;
                    }
                    caps.sliders += 1;
                    CapabilityDescriptor {
                        kind: ObjectKind::Slider,
                        index: caps.sliders - 1,
                    }
                }
                axis => {
                    let Some(slot) = axis.axis_slot() else {
                        continue;
                    };
                    if let Err(e) = configure_axis(object) {
                        warn!("[CAPS/SKIP] axis id={:#x}: range rejected: {e}", object.id);
                        continue;
                    }
                    caps.axes += 1;
                    CapabilityDescriptor {
                        kind: ObjectKind::Axis,
                        index: slot,
                    }
                }
            };
            caps.descriptors.push(descriptor);
        }

        caps.descriptors.sort();
        caps
    }

    #[inline]
    pub fn descriptors(&self) -> &[CapabilityDescriptor] {
        &self.descriptors
    }

    /// Exposed axes: true axes plus sliders.
    #[inline]
    pub fn axis_count(&self) -> usize {
        self.axes + self.sliders
    }

    #[inline]
    pub fn true_axis_count(&self) -> usize {
        self.axes
    }

    #[inline]
    pub fn button_count(&self) -> usize {
        self.buttons
    }

    #[inline]
    pub fn hat_count(&self) -> usize {
        self.hats
    }

    /// Walk the descriptors in order and write normalized values.
    ///
    /// The output slices are expected to be sized to the discovered counts; extra
    /// descriptors are ignored rather than indexing out of bounds.
    pub fn apply(
        &self,
        state: &JoyState,
        axes: &mut [f64],
        buttons: &mut [bool],
        hats: &mut [HatState],
    ) {
        let (mut ai, mut bi, mut hi) = (0usize, 0usize, 0usize);
        for d in &self.descriptors {
            match d.kind {
                ObjectKind::Axis | ObjectKind::Slider => {
                    let raw = if d.kind == ObjectKind::Axis {
                        state.axes.get(d.index)
                    } else {
                        state.sliders.get(d.index)
                    };
                    if let (Some(out), Some(&raw)) = (axes.get_mut(ai), raw) {
                        *out = normalize_axis(raw);
                    }
                    ai += 1;
                }
                ObjectKind::Button => {
                    if let (Some(out), Some(&raw)) =
                        (buttons.get_mut(bi), state.buttons.get(d.index))
                    {
                        *out = button_pressed(raw);
                    }
                    bi += 1;
                }
                ObjectKind::Hat => {
                    if let (Some(out), Some(&raw)) = (hats.get_mut(hi), state.povs.get(d.index)) {
                        *out = hat_from_pov(raw);
                    }
                    hi += 1;
                }
            }
        }
    }
}

/// Map a signed 16-bit reading onto roughly `[-1, 1]`.
///
/// `(v + 0.5) / 32767.5`: both ends land within 1.5e-5 of ±1 and zero maps to
/// about 1.53e-5. The offset is intentional and must not be "centered".
#[inline]
pub fn normalize_axis(v: i32) -> f64 {
    (f64::from(v) + 0.5) / 32767.5
}

/// Map an unsigned 8-bit trigger onto `[-1, 1]`.
#[inline]
pub fn normalize_trigger(v: u8) -> f64 {
    f64::from(v) / 127.5 - 1.0
}

/// A button byte is pressed when its high bit is set.
#[inline]
pub fn button_pressed(raw: u8) -> bool {
    raw & 0x80 != 0
}

/// Bucket a POV reading (hundredths of a degree) into a hat direction.
///
/// Each direction covers `[k * 45°, (k + 1) * 45°)`, so an exact boundary belongs to
/// the next bucket clockwise. A low word of `0xFFFF` is the centered sentinel.
pub fn hat_from_pov(raw: u32) -> HatState {
    if raw & 0xFFFF == 0xFFFF {
        return HatState::Centered;
    }
    HatState::from_slot(raw / POV_SECTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::POV_CENTERED;
    use proptest::prelude::*;

    fn obj(object_type: ObjectType, id: u32) -> DeviceObject {
        DeviceObject { object_type, id }
    }

    fn accept_all(_: &DeviceObject) -> Result<(), BackendError> {
        Ok(())
    }

    #[test]
    fn two_axes_slider_four_buttons_one_hat() {
        let objects = [
            obj(ObjectType::XAxis, 1),
            obj(ObjectType::YAxis, 2),
            obj(ObjectType::Slider, 3),
            obj(ObjectType::Button, 4),
            obj(ObjectType::Button, 5),
            obj(ObjectType::Button, 6),
            obj(ObjectType::Button, 7),
            obj(ObjectType::Pov, 8),
        ];
        let caps = Capabilities::from_objects(&objects, accept_all);
        assert_eq!(caps.axis_count(), 3);
        assert_eq!(caps.true_axis_count(), 2);
        assert_eq!(caps.button_count(), 4);
        assert_eq!(caps.hat_count(), 1);
        assert_eq!(
            caps.descriptors().len(),
            caps.axis_count() + caps.button_count() + caps.hat_count()
        );
    }

    #[test]
    fn descriptors_sort_by_kind_then_index() {
        // Device order deliberately scrambled.
        let objects = [
            obj(ObjectType::Pov, 1),
            obj(ObjectType::Button, 2),
            obj(ObjectType::Slider, 3),
            obj(ObjectType::RzAxis, 4),
            obj(ObjectType::XAxis, 5),
            obj(ObjectType::Button, 6),
        ];
        let caps = Capabilities::from_objects(&objects, accept_all);
        let got: Vec<_> = caps.descriptors().iter().map(|d| (d.kind, d.index)).collect();
        assert_eq!(
            got,
            vec![
                (ObjectKind::Axis, 0),
                (ObjectKind::Axis, 5),
                (ObjectKind::Slider, 0),
                (ObjectKind::Button, 0),
                (ObjectKind::Button, 1),
                (ObjectKind::Hat, 0),
            ]
        );
    }

    #[test]
    fn rediscovery_is_idempotent() {
        let objects = [
            obj(ObjectType::Button, 1),
            obj(ObjectType::ZAxis, 2),
            obj(ObjectType::Slider, 3),
            obj(ObjectType::YAxis, 4),
            obj(ObjectType::Pov, 5),
        ];
        let a = Capabilities::from_objects(&objects, accept_all);
        let b = Capabilities::from_objects(&objects, accept_all);
        assert_eq!(a, b);
    }

    #[test]
    fn rejected_range_skips_only_that_object() {
        let objects = [
            obj(ObjectType::XAxis, 1),
            obj(ObjectType::YAxis, 2),
            obj(ObjectType::Button, 3),
        ];
        let caps = Capabilities::from_objects(&objects, |o| {
            if o.id == 2 {
                Err(BackendError::Native {
                    call: "SetProperty",
                    code: 0x8007_0057,
                })
            } else {
                Ok(())
            }
        });
        assert_eq!(caps.axis_count(), 1);
        assert_eq!(caps.button_count(), 1);
    }

    #[test]
    fn unknown_objects_are_skipped() {
        let objects = [
            obj(ObjectType::Unknown, 1),
            obj(ObjectType::Button, 2),
        ];
        let caps = Capabilities::from_objects(&objects, accept_all);
        assert_eq!(caps.descriptors().len(), 1);
        assert_eq!(caps.axis_count(), 0);
    }

    #[test]
    fn counts_are_capped_by_report_layout() {
        let mut objects = Vec::new();
        for i in 0..40 {
            objects.push(obj(ObjectType::Button, i));
        }
        for i in 40..44 {
            objects.push(obj(ObjectType::Slider, i));
        }
        for i in 44..50 {
            objects.push(obj(ObjectType::Pov, i));
        }
        let caps = Capabilities::from_objects(&objects, accept_all);
        assert_eq!(caps.button_count(), MAX_BUTTONS);
        assert_eq!(caps.axis_count(), MAX_SLIDERS);
        assert_eq!(caps.hat_count(), MAX_POVS);
    }

    #[test]
    fn apply_folds_sliders_after_true_axes() {
        let objects = [
            obj(ObjectType::Slider, 1),
            obj(ObjectType::YAxis, 2),
            obj(ObjectType::XAxis, 3),
            obj(ObjectType::Button, 4),
            obj(ObjectType::Pov, 5),
        ];
        let caps = Capabilities::from_objects(&objects, accept_all);
        let mut state = JoyState::default();
        state.axes[0] = AXIS_MAX; // X
        state.axes[1] = AXIS_MIN; // Y
        state.sliders[0] = 0;
        state.buttons[0] = 0x80;
        state.povs[0] = 9000;

        let mut axes = vec![0.0; caps.axis_count()];
        let mut buttons = vec![false; caps.button_count()];
        let mut hats = vec![HatState::Centered; caps.hat_count()];
        caps.apply(&state, &mut axes, &mut buttons, &mut hats);

        assert!((axes[0] - 1.0).abs() < 1e-4, "axis 0 is X");
        assert!((axes[1] + 1.0).abs() < 1e-4, "axis 1 is Y");
        assert!(axes[2].abs() < 1e-4, "axis 2 is the slider");
        assert_eq!(buttons, vec![true]);
        assert_eq!(hats, vec![HatState::Right]);
    }

    #[test]
    fn apply_tolerates_short_output_slices() {
        let objects = [obj(ObjectType::XAxis, 1), obj(ObjectType::Button, 2)];
        let caps = Capabilities::from_objects(&objects, accept_all);
        caps.apply(&JoyState::default(), &mut [], &mut [], &mut []);
    }

    #[test]
    fn axis_normalization_reference_points() {
        assert!((normalize_axis(0) - 0.0000152590219).abs() < 1e-9);
        assert!((normalize_axis(AXIS_MAX) - 1.0).abs() < 1e-12);
        assert!((normalize_axis(AXIS_MIN) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn trigger_normalization_endpoints() {
        assert!((normalize_trigger(255) - 1.0).abs() < 1e-12);
        assert!((normalize_trigger(0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn button_uses_high_bit_only() {
        assert!(button_pressed(0x80));
        assert!(button_pressed(0xff));
        assert!(!button_pressed(0x7f));
        assert!(!button_pressed(0x00));
    }

    #[test]
    fn hat_cardinal_points_and_sentinel() {
        assert_eq!(hat_from_pov(0), HatState::Up);
        assert_eq!(hat_from_pov(9000), HatState::Right);
        assert_eq!(hat_from_pov(18000), HatState::Down);
        assert_eq!(hat_from_pov(27000), HatState::Left);
        assert_eq!(hat_from_pov(POV_CENTERED), HatState::Centered);
        assert_eq!(hat_from_pov(0x0000_FFFF), HatState::Centered);
    }

    #[test]
    fn hat_boundaries_round_up() {
        assert_eq!(hat_from_pov(4499), HatState::Up);
        assert_eq!(hat_from_pov(4500), HatState::UpRight);
        assert_eq!(hat_from_pov(31500), HatState::UpLeft);
        assert_eq!(hat_from_pov(35900), HatState::UpLeft);
        assert_eq!(hat_from_pov(36000), HatState::Centered);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(256))]

        #[test]
        fn prop_axis_normalization_is_monotonic(a in i16::MIN..i16::MAX) {
            let a = i32::from(a);
            prop_assert!(normalize_axis(a) < normalize_axis(a + 1));
        }

        #[test]
        fn prop_axis_normalization_stays_in_range(v in any::<i16>()) {
            let n = normalize_axis(i32::from(v));
            prop_assert!((-1.000015..=1.000015).contains(&n), "got {}", n);
        }

        #[test]
        fn prop_hat_bucket_matches_sector(raw in 0u32..36000) {
            let hat = hat_from_pov(raw);
            prop_assert_eq!(hat.slot(), (raw / 4500) as i16);
        }
    }
}
