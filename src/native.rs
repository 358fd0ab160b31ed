//! Backend arbiter.
//!
//! [`NativeGamepads`] owns both native backends, the device-change flag and the
//! message hook. It decides which devices enter the registry:
//!
//! - **Joystick API:** enumerate, skip GUIDs already registered, skip devices the
//!   slot API already serves, then open the device, run capability discovery and
//!   insert it.
//! - **Slot API:** probe slots `0..slot_count`, skip slots already registered, insert
//!   every slot that reports capabilities. An empty slot is not an error.
//!
//! # Failure model
//! A backend failure during discovery is recorded and returned from every later
//! [`update`](NativeGamepads::update) and [`discover`](NativeGamepads::discover) until
//! [`clear_error`](NativeGamepads::clear_error) is called.
//!
//! # Threading
//! Everything here runs on the thread that owns the host window. The only thing that
//! crosses the message-dispatch boundary is the [`DeviceChangeNotifier`].

use crate::backends::{Guid, JoystickBackend, RawHidDevice, SlotBackend};
use crate::config::GamepadConfig;
use crate::device::{JoystickPad, NativeGamepad, SlotPad};
use crate::error::{BackendError, Error};
use crate::fingerprint::Fingerprint;
use crate::hotplug::{DeviceChangeFlag, DeviceChangeNotifier, MessageHook};
use crate::registry::Gamepads;
use log::{debug, error, info};

/// Slot device subtypes.
pub mod slot_subtype {
    pub const GAMEPAD: u8 = 0x01;
    pub const WHEEL: u8 = 0x02;
    pub const ARCADE_STICK: u8 = 0x03;
    pub const FLIGHT_STICK: u8 = 0x04;
    pub const DANCE_PAD: u8 = 0x05;
    pub const GUITAR: u8 = 0x06;
    pub const DRUM_KIT: u8 = 0x08;
}

/// Slot capability flag: the controller is wireless.
pub const SLOT_CAPS_WIRELESS: u16 = 0x0002;

/// Display name for a slot device.
pub fn slot_display_name(subtype: u8, flags: u16) -> &'static str {
    match subtype {
        slot_subtype::GAMEPAD if flags & SLOT_CAPS_WIRELESS != 0 => "Wireless Xbox Controller",
        slot_subtype::GAMEPAD => "Xbox Controller",
        slot_subtype::WHEEL => "XInput Wheel",
        slot_subtype::ARCADE_STICK => "XInput Arcade Stick",
        slot_subtype::FLIGHT_STICK => "XInput Flight Stick",
        slot_subtype::DANCE_PAD => "XInput Dance Pad",
        slot_subtype::GUITAR => "XInput Guitar",
        slot_subtype::DRUM_KIT => "XInput Drum Kit",
        _ => "Unknown XInput Device",
    }
}

/// Whether the slot API already serves the joystick with this product GUID.
///
/// Heuristic: some raw HID device matches the product's vendor/product word and its
/// OS name contains `infix` (`"IG_"` for the slot-API driver's interfaces).
pub fn is_claimed_by_slot_api(product: &Guid, raw_hid: &[RawHidDevice], infix: &str) -> bool {
    raw_hid.iter().any(|d| {
        let vid_pid = u32::from(d.vendor_id) | (u32::from(d.product_id) << 16);
        vid_pid == product.data1 && d.name.contains(infix)
    })
}

/// Owner of the native backends. See the module docs.
pub struct NativeGamepads {
    config: GamepadConfig,
    joysticks: Option<Box<dyn JoystickBackend>>,
    slots: Option<Box<dyn SlotBackend>>,
    hook: Option<Box<dyn MessageHook>>,
    hook_installed: bool,
    changed: DeviceChangeFlag,
    err: Option<Error>,
}

impl NativeGamepads {
    /// Build an arbiter over already-loaded backends.
    ///
    /// `config` is validated first. A backend disabled in `config` is dropped even
    /// if one is supplied.
    pub fn new(
        config: GamepadConfig,
        joysticks: Option<Box<dyn JoystickBackend>>,
        slots: Option<Box<dyn SlotBackend>>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let joysticks = joysticks.filter(|_| config.joystick_api);
        let slots = slots.filter(|_| config.slot_api);
        Ok(Self {
            config,
            joysticks,
            slots,
            hook: None,
            hook_installed: false,
            changed: DeviceChangeFlag::new(),
            err: None,
        })
    }

    /// Use `hook` to intercept the host window's message dispatch.
    pub fn with_message_hook(mut self, hook: Box<dyn MessageHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Load the Win32 backends that exist on this host and the window hook.
    ///
    /// A missing backend is logged and skipped.
    #[cfg(all(feature = "native", target_os = "windows"))]
    pub fn load(config: GamepadConfig) -> Result<Self, Error> {
        use crate::backends::windows::{DirectInput, WindowHook, XInput};

        config.validate()?;
        let joysticks: Option<Box<dyn JoystickBackend>> = if config.joystick_api {
            match DirectInput::load() {
                Ok(api) => Some(Box::new(api)),
                Err(e) => {
                    log::warn!("[NATIVE/LOAD] {e}");
                    None
                }
            }
        } else {
            None
        };

        let slots: Option<Box<dyn SlotBackend>> = if config.slot_api {
            match XInput::load() {
                Ok(api) => Some(Box::new(api)),
                Err(e) => {
                    log::warn!("[NATIVE/LOAD] {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::new(config, joysticks, slots)?.with_message_hook(Box::new(WindowHook::new())))
    }

    #[inline]
    pub fn config(&self) -> &GamepadConfig {
        &self.config
    }

    #[inline]
    pub fn has_joystick_api(&self) -> bool {
        self.joysticks.is_some()
    }

    #[inline]
    pub fn has_slot_api(&self) -> bool {
        self.slots.is_some()
    }

    /// Write handle for hosts that forward window messages themselves.
    pub fn notifier(&self) -> DeviceChangeNotifier {
        self.changed.notifier()
    }

    /// Initial discovery.
    ///
    /// Joysticks are enumerated now. Slots are probed by the first
    /// [`update`](Self::update), which this call schedules.
    pub fn initialize(&mut self, gamepads: &mut Gamepads) -> Result<(), Error> {
        info!(
            "[NATIVE/INIT] joystick_api={} slot_api={}",
            self.has_joystick_api(),
            self.has_slot_api()
        );
        self.check()?;
        let result = self.discover_joysticks(gamepads);
        self.record(result)?;
        self.changed.arm();
        Ok(())
    }

    /// One full discovery pass over both backends.
    pub fn discover(&mut self, gamepads: &mut Gamepads) -> Result<(), Error> {
        self.check()?;
        let result = self
            .discover_joysticks(gamepads)
            .and_then(|()| self.discover_slots(gamepads));
        self.record(result)
    }

    /// `true` if a device change was signalled and not yet handled.
    #[inline]
    pub fn poll_for_hotplug(&self) -> bool {
        self.changed.is_set()
    }

    /// Per-tick housekeeping: install the hook once, then re-run discovery if a
    /// device change was signalled since the last tick.
    pub fn update(&mut self, gamepads: &mut Gamepads) -> Result<(), Error> {
        self.check()?;
        self.install_hook()?;

        // Cleared before discovery so a change signalled mid-pass is seen next tick.
        if self.changed.take() {
            debug!("[NATIVE/HOTPLUG] device change; rediscovering");
            self.discover(gamepads)?;
        }
        Ok(())
    }

    /// The recorded discovery error, if any.
    #[inline]
    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Forget the recorded discovery error and schedule a fresh discovery pass.
    pub fn clear_error(&mut self) {
        if self.err.take().is_some() {
            self.changed.arm();
        }
    }

    /// The slot backend, for polling slot devices.
    pub fn slot_backend_mut(&mut self) -> Option<&mut (dyn SlotBackend + 'static)> {
        self.slots.as_deref_mut()
    }

    fn check(&self) -> Result<(), Error> {
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn record(&mut self, result: Result<(), Error>) -> Result<(), Error> {
        if let Err(e) = &result {
            error!("[NATIVE/DISCOVERY] {e}");
            self.err = Some(e.clone());
        }
        result
    }

    fn install_hook(&mut self) -> Result<(), Error> {
        if self.hook_installed {
            return Ok(());
        }
        let Some(hook) = self.hook.as_deref_mut() else {
            return Ok(());
        };
        if hook.install(self.changed.notifier())? {
            info!("[NATIVE/HOOK] device-change hook installed");
            self.hook_installed = true;
        }
        Ok(())
    }

    fn discover_joysticks(&mut self, gamepads: &mut Gamepads) -> Result<(), Error> {
        let Some(backend) = self.joysticks.as_deref_mut() else {
            return Ok(());
        };
        let infix = self.config.claimed_name_infix.as_str();

        let instances = backend
            .enumerate()
            .map_err(|e| Error::discovery("enumerate joysticks", e))?;

        let mut raw_hid: Option<Vec<RawHidDevice>> = None;
        for instance in instances {
            let guid = instance.instance_guid;
            if gamepads
                .find(|g| g.native().joystick_guid() == Some(&guid))
                .is_some()
            {
                continue;
            }

            if raw_hid.is_none() {
                raw_hid = Some(
                    backend
                        .raw_hid_devices()
                        .map_err(|e| Error::discovery("list raw HID devices", e))?,
                );
            }
            let hid = raw_hid.as_deref().unwrap_or_default();
            if is_claimed_by_slot_api(&instance.product_guid, hid, infix) {
                debug!(
                    "[NATIVE/SKIP] {:?} is served by the slot API",
                    instance.name
                );
                continue;
            }

            let device = backend
                .create_device(&instance)
                .map_err(|e| Error::discovery("open a joystick", e))?;
            let pad = JoystickPad::open(guid, device)?;
            debug!(
                "[NATIVE/CAPS] {:?} axes={} buttons={} hats={}",
                instance.name,
                pad.capabilities().axis_count(),
                pad.capabilities().button_count(),
                pad.capabilities().hat_count()
            );

            let fingerprint = Fingerprint::for_joystick(&instance.product_guid, &instance.name);
            gamepads.add(instance.name, fingerprint, NativeGamepad::Joystick(pad));
        }
        Ok(())
    }

    fn discover_slots(&mut self, gamepads: &mut Gamepads) -> Result<(), Error> {
        let Some(backend) = self.slots.as_deref_mut() else {
            return Ok(());
        };

        for slot in 0..self.config.slot_count {
            if gamepads
                .find(|g| g.native().slot_index() == Some(slot))
                .is_some()
            {
                continue;
            }

            let caps = match backend.capabilities(slot) {
                Ok(caps) => caps,
                Err(BackendError::NotConnected) => continue,
                Err(e) => return Err(Error::discovery("probe a controller slot", e)),
            };

            gamepads.add(
                slot_display_name(caps.subtype, caps.flags),
                Fingerprint::for_slot(caps.subtype),
                NativeGamepad::Slot(SlotPad::new(slot)),
            );
        }
        Ok(())
    }
}
