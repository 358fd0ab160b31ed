//! Scripted fake host for unit tests.
//!
//! [`FakeHost`] holds the whole simulated machine (attached joysticks, raw HID list,
//! occupied slots, host window) behind one `Rc<RefCell<_>>`. The backend and hook
//! handles it hands out share that state, so a test can plug, unplug and inject
//! failures while the arbiter owns the backends.

use crate::backends::{
    DeviceInstance, DeviceObject, Guid, JoyState, JoystickBackend, JoystickDevice, ObjectType,
    RawHidDevice, SlotBackend, SlotCapabilities, SlotState,
};
use crate::error::{BackendError, Error};
use crate::hotplug::{self, DeviceChangeNotifier, MessageHook};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

/// A joystick to plug into a [`FakeHost`].
#[derive(Clone, Debug)]
pub struct FakeJoystick {
    pub instance: DeviceInstance,
    pub objects: Vec<DeviceObject>,
}

impl FakeJoystick {
    /// `n` becomes the instance GUID's `data1` and the key used by the host.
    pub fn new(n: u32, name: &str) -> Self {
        Self {
            instance: DeviceInstance {
                instance_guid: Guid {
                    data1: n,
                    ..Guid::default()
                },
                product_guid: Guid::default(),
                name: name.to_string(),
            },
            objects: Vec::new(),
        }
    }

    pub fn with_objects(mut self, types: &[ObjectType]) -> Self {
        self.objects = types
            .iter()
            .enumerate()
            .map(|(i, &object_type)| DeviceObject {
                object_type,
                id: i as u32,
            })
            .collect();
        self
    }

    /// Product GUID carrying vendor/product ids with the `PIDVID` marker.
    pub fn with_vid_pid(mut self, vid: u16, pid: u16) -> Self {
        self.instance.product_guid = Guid {
            data1: u32::from(vid) | (u32::from(pid) << 16),
            data2: 0,
            data3: 0,
            data4: [0, 0, b'P', b'I', b'D', b'V', b'I', b'D'],
        };
        self
    }

    fn key(&self) -> u32 {
        self.instance.instance_guid.data1
    }
}

#[derive(Debug, Default)]
struct JoystickState {
    state: JoyState,
    reads: VecDeque<Result<JoyState, BackendError>>,
    acquire_calls: usize,
    unplugged: bool,
}

#[derive(Debug, Default)]
struct SlotEntry {
    caps: SlotCapabilities,
    state: SlotState,
    state_error: Option<BackendError>,
    state_calls: usize,
}

#[derive(Debug, Default)]
struct HostState {
    attached: Vec<FakeJoystick>,
    joysticks: BTreeMap<u32, JoystickState>,
    raw_hid: Vec<RawHidDevice>,
    enumerate_calls: usize,
    enumerate_error: Option<BackendError>,
    notify_on_enumerate: bool,
    opened: usize,

    slots: BTreeMap<u32, SlotEntry>,
    capability_calls: usize,
    capability_error: Option<BackendError>,

    window_available: bool,
    hook_installs: usize,
    notifier: Option<DeviceChangeNotifier>,

    released: Vec<&'static str>,
}

/// Simulated machine. Clones share state.
#[derive(Clone, Debug)]
pub struct FakeHost(Rc<RefCell<HostState>>);

impl FakeHost {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(HostState {
            window_available: true,
            ..HostState::default()
        })))
    }

    // --- joysticks -------------------------------------------------------------

    pub fn plug(&self, joystick: FakeJoystick) {
        let mut h = self.0.borrow_mut();
        h.joysticks.insert(joystick.key(), JoystickState::default());
        h.attached.push(joystick);
    }

    /// Detach a joystick. Its open handle keeps failing with `InputLost`.
    pub fn unplug(&self, n: u32) {
        let mut h = self.0.borrow_mut();
        h.attached.retain(|j| j.key() != n);
        if let Some(js) = h.joysticks.get_mut(&n) {
            js.unplugged = true;
        }
    }

    /// Open a device directly, bypassing enumeration.
    pub fn open_device(&self, joystick: &FakeJoystick) -> Box<dyn JoystickDevice> {
        let mut h = self.0.borrow_mut();
        h.joysticks.entry(joystick.key()).or_default();
        h.opened += 1;
        Box::new(FakeDevice {
            host: self.clone(),
            key: joystick.key(),
            objects: joystick.objects.clone(),
        })
    }

    pub fn set_joy_state(&self, n: u32, state: JoyState) {
        if let Some(js) = self.0.borrow_mut().joysticks.get_mut(&n) {
            js.state = state;
        }
    }

    /// Queue results returned by the next `read_state` calls, before the live state.
    pub fn push_read_results(&self, n: u32, results: &[Result<JoyState, BackendError>]) {
        if let Some(js) = self.0.borrow_mut().joysticks.get_mut(&n) {
            js.reads.extend(results.iter().cloned());
        }
    }

    pub fn acquire_calls(&self, n: u32) -> usize {
        self.0
            .borrow()
            .joysticks
            .get(&n)
            .map_or(0, |js| js.acquire_calls)
    }

    pub fn add_raw_hid(&self, vendor_id: u16, product_id: u16, name: &str) {
        self.0.borrow_mut().raw_hid.push(RawHidDevice {
            vendor_id,
            product_id,
            name: name.to_string(),
        });
    }

    pub fn fail_enumerate(&self, error: Option<BackendError>) {
        self.0.borrow_mut().enumerate_error = error;
    }

    /// Fire a device-change message from inside the next enumeration.
    pub fn notify_during_next_enumerate(&self) {
        self.0.borrow_mut().notify_on_enumerate = true;
    }

    pub fn enumerate_calls(&self) -> usize {
        self.0.borrow().enumerate_calls
    }

    pub fn opened_devices(&self) -> usize {
        self.0.borrow().opened
    }

    pub fn joystick_backend(&self) -> FakeJoysticks {
        FakeJoysticks(self.clone())
    }

    // --- slots -----------------------------------------------------------------

    pub fn connect_slot(&self, slot: u32, subtype: u8, flags: u16) {
        self.0.borrow_mut().slots.insert(
            slot,
            SlotEntry {
                caps: SlotCapabilities { subtype, flags },
                ..SlotEntry::default()
            },
        );
    }

    pub fn disconnect_slot(&self, slot: u32) {
        self.0.borrow_mut().slots.remove(&slot);
    }

    pub fn set_slot_state(&self, slot: u32, state: SlotState) {
        if let Some(entry) = self.0.borrow_mut().slots.get_mut(&slot) {
            entry.state = state;
        }
    }

    pub fn fail_slot_state(&self, slot: u32, error: BackendError) {
        if let Some(entry) = self.0.borrow_mut().slots.get_mut(&slot) {
            entry.state_error = Some(error);
        }
    }

    pub fn slot_state_calls(&self, slot: u32) -> usize {
        self.0
            .borrow()
            .slots
            .get(&slot)
            .map_or(0, |e| e.state_calls)
    }

    pub fn fail_capabilities(&self, error: Option<BackendError>) {
        self.0.borrow_mut().capability_error = error;
    }

    pub fn capability_calls(&self) -> usize {
        self.0.borrow().capability_calls
    }

    pub fn slot_backend(&self) -> FakeSlots {
        FakeSlots(self.clone())
    }

    // --- window ----------------------------------------------------------------

    pub fn set_window_available(&self, available: bool) {
        self.0.borrow_mut().window_available = available;
    }

    pub fn hook_installs(&self) -> usize {
        self.0.borrow().hook_installs
    }

    pub fn hook(&self) -> FakeHook {
        FakeHook(self.clone())
    }

    /// Order in which device handles and the joystick backend were dropped.
    pub fn released(&self) -> Vec<&'static str> {
        self.0.borrow().released.clone()
    }

    fn release(&self, what: &'static str) {
        if let Ok(mut h) = self.0.try_borrow_mut() {
            h.released.push(what);
        }
    }

    /// Deliver a window message through the installed hook.
    ///
    /// Returns `true` if a hook was installed and the message was a device change.
    pub fn send_message(&self, msg: u32) -> bool {
        let notifier = self.0.borrow().notifier.clone();
        notifier.is_some_and(|n| hotplug::dispatch_message(msg, &n))
    }
}

/// Joystick backend over a [`FakeHost`].
pub struct FakeJoysticks(FakeHost);

impl Drop for FakeJoysticks {
    fn drop(&mut self) {
        self.0.release("joysticks");
    }
}

impl JoystickBackend for FakeJoysticks {
    fn enumerate(&mut self) -> Result<Vec<DeviceInstance>, BackendError> {
        let notify = {
            let mut h = (self.0).0.borrow_mut();
            h.enumerate_calls += 1;
            if let Some(e) = h.enumerate_error {
                return Err(e);
            }
            std::mem::take(&mut h.notify_on_enumerate)
        };
        if notify {
            self.0.send_message(hotplug::WM_DEVICECHANGE);
        }
        let h = (self.0).0.borrow();
        Ok(h.attached.iter().map(|j| j.instance.clone()).collect())
    }

    fn create_device(
        &mut self,
        instance: &DeviceInstance,
    ) -> Result<Box<dyn JoystickDevice>, BackendError> {
        let joystick = (self.0)
            .0
            .borrow()
            .attached
            .iter()
            .find(|j| j.instance == *instance)
            .cloned()
            .ok_or(BackendError::NotConnected)?;
        Ok(self.0.open_device(&joystick))
    }

    fn raw_hid_devices(&mut self) -> Result<Vec<RawHidDevice>, BackendError> {
        Ok((self.0).0.borrow().raw_hid.clone())
    }
}

struct FakeDevice {
    host: FakeHost,
    key: u32,
    objects: Vec<DeviceObject>,
}

impl FakeDevice {
    fn with_state<R>(&self, f: impl FnOnce(&mut JoystickState) -> R) -> Result<R, BackendError> {
        let mut h = self.host.0.borrow_mut();
        let js = h
            .joysticks
            .get_mut(&self.key)
            .ok_or(BackendError::InputLost)?;
        Ok(f(js))
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.host.release("device");
    }
}

impl JoystickDevice for FakeDevice {
    fn set_report_layout(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn set_absolute_axis_mode(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn objects(&mut self) -> Result<Vec<DeviceObject>, BackendError> {
        Ok(self.objects.clone())
    }

    fn set_axis_range(
        &mut self,
        _object: &DeviceObject,
        _min: i32,
        _max: i32,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    fn acquire(&mut self) -> Result<(), BackendError> {
        self.with_state(|js| {
            js.acquire_calls += 1;
            if js.unplugged {
                Err(BackendError::InputLost)
            } else {
                Ok(())
            }
        })?
    }

    fn poll(&mut self) -> Result<(), BackendError> {
        self.with_state(|js| {
            if js.unplugged {
                Err(BackendError::NotAcquired)
            } else {
                Ok(())
            }
        })?
    }

    fn read_state(&mut self) -> Result<JoyState, BackendError> {
        self.with_state(|js| match js.reads.pop_front() {
            Some(result) => result,
            None if js.unplugged => Err(BackendError::InputLost),
            None => Ok(js.state),
        })?
    }
}

/// Slot backend over a [`FakeHost`].
pub struct FakeSlots(FakeHost);

impl SlotBackend for FakeSlots {
    fn capabilities(&mut self, slot: u32) -> Result<SlotCapabilities, BackendError> {
        let mut h = (self.0).0.borrow_mut();
        h.capability_calls += 1;
        if let Some(e) = h.capability_error {
            return Err(e);
        }
        h.slots
            .get(&slot)
            .map(|e| e.caps)
            .ok_or(BackendError::NotConnected)
    }

    fn state(&mut self, slot: u32) -> Result<SlotState, BackendError> {
        let mut h = (self.0).0.borrow_mut();
        let entry = h.slots.get_mut(&slot).ok_or(BackendError::NotConnected)?;
        entry.state_calls += 1;
        match entry.state_error {
            Some(e) => Err(e),
            None => Ok(entry.state),
        }
    }
}

/// Message hook over a [`FakeHost`]. Refuses a second installation.
pub struct FakeHook(FakeHost);

impl MessageHook for FakeHook {
    fn install(&mut self, notifier: DeviceChangeNotifier) -> Result<bool, Error> {
        let mut h = (self.0).0.borrow_mut();
        if !h.window_available {
            return Ok(false);
        }
        if h.notifier.is_some() {
            return Err(Error::Hook("already installed".into()));
        }
        h.hook_installs += 1;
        h.notifier = Some(notifier);
        Ok(true)
    }
}
