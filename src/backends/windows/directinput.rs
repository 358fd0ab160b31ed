#![cfg(target_os = "windows")]
#![allow(non_camel_case_types)]

//! DirectInput 8 joystick backend.
//!
//! `dinput8.dll` is loaded at runtime, so a host without it simply has no joystick
//! backend. The COM interfaces are declared by hand: only the vtable slots this
//! backend calls are typed, the rest are opaque pointers.
//!
//! Every device is switched to the classic `DIJOYSTATE` report (6 axes, 2 sliders,
//! 4 POVs, 32 buttons, all optional), absolute axis mode, and a -32768..32767 range
//! per axis object.

use super::hid_discovery::RawHidList;
use crate::backends::{
    DeviceInstance, DeviceObject, Guid, JoyState, JoystickBackend, JoystickDevice, ObjectType,
    RawHidDevice, MAX_AXES, MAX_BUTTONS, MAX_POVS, MAX_SLIDERS,
};
use crate::error::{BackendError, Error};
use log::{debug, info};
use std::ffi::c_void;
use std::mem::size_of;
use std::ptr;
use std::rc::Rc;
use windows_sys::core::HRESULT;
use windows_sys::Win32::Foundation::{FreeLibrary, HMODULE};
use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress, LoadLibraryW};

// --- constants (dinput.h) ----------------------------------------------------------

const DIRECTINPUT_VERSION: u32 = 0x0800;
const DI8DEVCLASS_GAMECTRL: u32 = 4;
const DIEDFL_ALLDEVICES: u32 = 0;
const DIENUM_CONTINUE: i32 = 1;

const DIDF_ABSAXIS: u32 = 0x0000_0001;
const DIDFT_AXIS: u32 = 0x0000_0003;
const DIDFT_BUTTON: u32 = 0x0000_000C;
const DIDFT_POV: u32 = 0x0000_0010;
const DIDFT_OPTIONAL: u32 = 0x8000_0000;
const DIDFT_ANYINSTANCE: u32 = 0x00FF_FF00;
const DIDOI_ASPECTPOSITION: u32 = 0x0000_0100;

const DIPH_DEVICE: u32 = 0;
const DIPH_BYID: u32 = 2;
const DIPROPAXISMODE_ABS: u32 = 0;

const DIERR_NOTACQUIRED: u32 = 0x8007_000C;
const DIERR_INPUTLOST: u32 = 0x8007_001E;

/// `MAKEDIPROP(n)`: property ids are small integers passed as GUID pointers.
fn diprop(n: usize) -> *const Guid {
    n as *const Guid
}
const DIPROP_AXISMODE: usize = 2;
const DIPROP_RANGE: usize = 4;

static IID_IDIRECTINPUT8W: Guid = Guid::from_u128(0xbf798031_483a_4da2_aa99_5d64ed369700);
static GUID_XAXIS: Guid = Guid::from_u128(0xa36d02e0_c9f3_11cf_bfc7_444553540000);
static GUID_YAXIS: Guid = Guid::from_u128(0xa36d02e1_c9f3_11cf_bfc7_444553540000);
static GUID_ZAXIS: Guid = Guid::from_u128(0xa36d02e2_c9f3_11cf_bfc7_444553540000);
static GUID_RXAXIS: Guid = Guid::from_u128(0xa36d02f4_c9f3_11cf_bfc7_444553540000);
static GUID_RYAXIS: Guid = Guid::from_u128(0xa36d02f5_c9f3_11cf_bfc7_444553540000);
static GUID_RZAXIS: Guid = Guid::from_u128(0xa36d02e3_c9f3_11cf_bfc7_444553540000);
static GUID_SLIDER: Guid = Guid::from_u128(0xa36d02e4_c9f3_11cf_bfc7_444553540000);
static GUID_POV: Guid = Guid::from_u128(0xa36d02f2_c9f3_11cf_bfc7_444553540000);

// --- structures --------------------------------------------------------------------

#[repr(C)]
#[allow(dead_code)]
struct DIDEVICEINSTANCEW {
    dw_size: u32,
    guid_instance: Guid,
    guid_product: Guid,
    dw_dev_type: u32,
    tsz_instance_name: [u16; 260],
    tsz_product_name: [u16; 260],
    guid_ff_driver: Guid,
    w_usage_page: u16,
    w_usage: u16,
}

#[repr(C)]
#[allow(dead_code)]
struct DIDEVICEOBJECTINSTANCEW {
    dw_size: u32,
    guid_type: Guid,
    dw_ofs: u32,
    dw_type: u32,
    dw_flags: u32,
    tsz_name: [u16; 260],
    dw_ff_max_force: u32,
    dw_ff_force_resolution: u32,
    w_collection_number: u16,
    w_designator_index: u16,
    w_usage_page: u16,
    w_usage: u16,
    dw_dimension: u32,
    w_exponent: u16,
    w_reserved: u16,
}

#[repr(C)]
#[allow(dead_code)]
struct DIPROPHEADER {
    dw_size: u32,
    dw_header_size: u32,
    dw_obj: u32,
    dw_how: u32,
}

#[repr(C)]
#[allow(dead_code)]
struct DIPROPDWORD {
    diph: DIPROPHEADER,
    dw_data: u32,
}

#[repr(C)]
#[allow(dead_code)]
struct DIPROPRANGE {
    diph: DIPROPHEADER,
    l_min: i32,
    l_max: i32,
}

#[repr(C)]
#[allow(dead_code)]
#[derive(Clone, Copy)]
struct DIOBJECTDATAFORMAT {
    pguid: *const Guid,
    dw_ofs: u32,
    dw_type: u32,
    dw_flags: u32,
}

#[repr(C)]
#[allow(dead_code)]
struct DIDATAFORMAT {
    dw_size: u32,
    dw_obj_size: u32,
    dw_flags: u32,
    dw_data_size: u32,
    dw_num_objs: u32,
    rgodf: *const DIOBJECTDATAFORMAT,
}

#[repr(C)]
#[derive(Default)]
struct DIJOYSTATE {
    l_x: i32,
    l_y: i32,
    l_z: i32,
    l_rx: i32,
    l_ry: i32,
    l_rz: i32,
    rgl_slider: [i32; MAX_SLIDERS],
    rgdw_pov: [u32; MAX_POVS],
    rgb_buttons: [u8; MAX_BUTTONS],
}

impl From<&DIJOYSTATE> for JoyState {
    fn from(s: &DIJOYSTATE) -> Self {
        JoyState {
            axes: [s.l_x, s.l_y, s.l_z, s.l_rx, s.l_ry, s.l_rz],
            sliders: s.rgl_slider,
            povs: s.rgdw_pov,
            buttons: s.rgb_buttons,
        }
    }
}

// --- COM interfaces ----------------------------------------------------------------

type EnumDevicesCallback =
    unsafe extern "system" fn(*const DIDEVICEINSTANCEW, *mut c_void) -> i32;
type EnumObjectsCallback =
    unsafe extern "system" fn(*const DIDEVICEOBJECTINSTANCEW, *mut c_void) -> i32;

#[repr(C)]
#[allow(dead_code)]
struct IDirectInput8WVtbl {
    query_interface: *const c_void,
    add_ref: *const c_void,
    release: unsafe extern "system" fn(*mut IDirectInput8W) -> u32,
    create_device: unsafe extern "system" fn(
        *mut IDirectInput8W,
        *const Guid,
        *mut *mut IDirectInputDevice8W,
        *mut c_void,
    ) -> HRESULT,
    enum_devices: unsafe extern "system" fn(
        *mut IDirectInput8W,
        u32,
        EnumDevicesCallback,
        *mut c_void,
        u32,
    ) -> HRESULT,
}

#[repr(C)]
struct IDirectInput8W {
    lpvtbl: *const IDirectInput8WVtbl,
}

#[repr(C)]
#[allow(dead_code)]
struct IDirectInputDevice8WVtbl {
    query_interface: *const c_void,
    add_ref: *const c_void,
    release: unsafe extern "system" fn(*mut IDirectInputDevice8W) -> u32,
    get_capabilities: *const c_void,
    enum_objects: unsafe extern "system" fn(
        *mut IDirectInputDevice8W,
        EnumObjectsCallback,
        *mut c_void,
        u32,
    ) -> HRESULT,
    get_property: *const c_void,
    set_property: unsafe extern "system" fn(
        *mut IDirectInputDevice8W,
        *const Guid,
        *const DIPROPHEADER,
    ) -> HRESULT,
    acquire: unsafe extern "system" fn(*mut IDirectInputDevice8W) -> HRESULT,
    unacquire: unsafe extern "system" fn(*mut IDirectInputDevice8W) -> HRESULT,
    get_device_state:
        unsafe extern "system" fn(*mut IDirectInputDevice8W, u32, *mut c_void) -> HRESULT,
    get_device_data: *const c_void,
    set_data_format:
        unsafe extern "system" fn(*mut IDirectInputDevice8W, *const DIDATAFORMAT) -> HRESULT,
    set_event_notification: *const c_void,
    set_cooperative_level: *const c_void,
    get_object_info: *const c_void,
    get_device_info: *const c_void,
    run_control_panel: *const c_void,
    initialize: *const c_void,
    create_effect: *const c_void,
    enum_effects: *const c_void,
    get_effect_info: *const c_void,
    get_force_feedback_state: *const c_void,
    send_force_feedback_command: *const c_void,
    enum_created_effect_objects: *const c_void,
    escape: *const c_void,
    poll: unsafe extern "system" fn(*mut IDirectInputDevice8W) -> HRESULT,
}

#[repr(C)]
struct IDirectInputDevice8W {
    lpvtbl: *const IDirectInputDevice8WVtbl,
}

type DirectInput8CreateFn = unsafe extern "system" fn(
    HMODULE,
    u32,
    *const Guid,
    *mut *mut IDirectInput8W,
    *mut c_void,
) -> HRESULT;

/// Map an HRESULT onto a [`BackendError`]. Any non-negative value is success.
fn check(call: &'static str, hr: HRESULT) -> Result<(), BackendError> {
    if hr >= 0 {
        return Ok(());
    }
    match hr as u32 {
        DIERR_NOTACQUIRED => Err(BackendError::NotAcquired),
        DIERR_INPUTLOST => Err(BackendError::InputLost),
        code => Err(BackendError::Native { call, code }),
    }
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn utf16_until_nul(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

// --- backend -----------------------------------------------------------------------

/// `dinput8.dll` and the interface created from it.
///
/// Shared by the backend and every device it opened: the DLL stays mapped until the
/// last device handle is released.
struct Library {
    module: HMODULE,
    api: *mut IDirectInput8W,
}

impl Library {
    fn vtbl(&self) -> &IDirectInput8WVtbl {
        // SAFETY: `api` is a live COM object for as long as `self` exists.
        unsafe { &*(*self.api).lpvtbl }
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        // SAFETY: `api` came from DirectInput8Create and is released exactly once,
        // before its DLL is unmapped.
        unsafe {
            (self.vtbl().release)(self.api);
            FreeLibrary(self.module);
        }
    }
}

/// DirectInput 8 instance plus the raw HID list used for the slot-API claim check.
pub struct DirectInput {
    lib: Rc<Library>,
    hid: RawHidList,
}

impl DirectInput {
    /// Load `dinput8.dll` and create an `IDirectInput8W`.
    pub fn load() -> Result<Self, Error> {
        const BACKEND: &str = "DirectInput 8";

        let name = wide("dinput8.dll");
        // SAFETY: `name` is NUL-terminated and outlives the call.
        let module = unsafe { LoadLibraryW(name.as_ptr()) };
        if module.is_null() {
            return Err(Error::BackendUnavailable { backend: BACKEND });
        }

        // SAFETY: the procedure name is NUL-terminated; the transmuted signature is
        // DirectInput8Create's documented one.
        let create: DirectInput8CreateFn =
            match unsafe { GetProcAddress(module, b"DirectInput8Create\0".as_ptr()) } {
                Some(p) => unsafe { std::mem::transmute(p) },
                None => {
                    unsafe { FreeLibrary(module) };
                    return Err(Error::BackendUnavailable { backend: BACKEND });
                }
            };

        let mut api: *mut IDirectInput8W = ptr::null_mut();
        // SAFETY: out-pointer is valid; a null module name yields this process's handle.
        let hr = unsafe {
            create(
                GetModuleHandleW(ptr::null()),
                DIRECTINPUT_VERSION,
                &IID_IDIRECTINPUT8W,
                &mut api,
                ptr::null_mut(),
            )
        };
        if let Err(e) = check("DirectInput8Create", hr) {
            unsafe { FreeLibrary(module) };
            return Err(Error::discovery("create the DirectInput 8 interface", e));
        }
        if api.is_null() {
            unsafe { FreeLibrary(module) };
            return Err(Error::BackendUnavailable { backend: BACKEND });
        }

        info!("[DINPUT/LOAD] DirectInput 8 ready");
        Ok(Self {
            lib: Rc::new(Library { module, api }),
            hid: RawHidList::new(),
        })
    }
}

unsafe extern "system" fn collect_instance(
    instance: *const DIDEVICEINSTANCEW,
    context: *mut c_void,
) -> i32 {
    let out = &mut *(context as *mut Vec<DeviceInstance>);
    let inst = &*instance;
    out.push(DeviceInstance {
        instance_guid: inst.guid_instance,
        product_guid: inst.guid_product,
        name: utf16_until_nul(&inst.tsz_instance_name),
    });
    DIENUM_CONTINUE
}

impl JoystickBackend for DirectInput {
    fn enumerate(&mut self) -> Result<Vec<DeviceInstance>, BackendError> {
        let mut found: Vec<DeviceInstance> = Vec::new();
        // SAFETY: `found` outlives the synchronous enumeration.
        let hr = unsafe {
            (self.lib.vtbl().enum_devices)(
                self.lib.api,
                DI8DEVCLASS_GAMECTRL,
                collect_instance,
                &mut found as *mut _ as *mut c_void,
                DIEDFL_ALLDEVICES,
            )
        };
        check("EnumDevices", hr)?;
        debug!("[DINPUT/ENUM] {} game controller(s)", found.len());
        Ok(found)
    }

    fn create_device(
        &mut self,
        instance: &DeviceInstance,
    ) -> Result<Box<dyn JoystickDevice>, BackendError> {
        let mut raw: *mut IDirectInputDevice8W = ptr::null_mut();
        // SAFETY: GUID and out-pointer are valid for the call.
        let hr = unsafe {
            (self.lib.vtbl().create_device)(
                self.lib.api,
                &instance.instance_guid,
                &mut raw,
                ptr::null_mut(),
            )
        };
        check("CreateDevice", hr)?;
        if raw.is_null() {
            return Err(BackendError::Native {
                call: "CreateDevice",
                code: 0,
            });
        }
        Ok(Box::new(DirectInputDevice {
            raw,
            format: None,
            _lib: Rc::clone(&self.lib),
        }))
    }

    fn raw_hid_devices(&mut self) -> Result<Vec<RawHidDevice>, BackendError> {
        self.hid.list()
    }
}

// --- device ------------------------------------------------------------------------

/// `c_dfDIJoystick`: 6 axes, 2 sliders, 4 POVs, 32 buttons, all optional.
struct JoystickDataFormat {
    objects: [DIOBJECTDATAFORMAT; MAX_AXES + MAX_SLIDERS + MAX_POVS + MAX_BUTTONS],
    format: DIDATAFORMAT,
}

impl JoystickDataFormat {
    fn new() -> Box<Self> {
        let empty = DIOBJECTDATAFORMAT {
            pguid: ptr::null(),
            dw_ofs: 0,
            dw_type: 0,
            dw_flags: 0,
        };
        let mut objects = [empty; MAX_AXES + MAX_SLIDERS + MAX_POVS + MAX_BUTTONS];

        let axis = DIDFT_OPTIONAL | DIDFT_AXIS | DIDFT_ANYINSTANCE;
        let axis_guids: [&'static Guid; MAX_AXES + MAX_SLIDERS] = [
            &GUID_XAXIS,
            &GUID_YAXIS,
            &GUID_ZAXIS,
            &GUID_RXAXIS,
            &GUID_RYAXIS,
            &GUID_RZAXIS,
            &GUID_SLIDER,
            &GUID_SLIDER,
        ];
        let mut i = 0;
        for (n, guid) in axis_guids.into_iter().enumerate() {
            objects[i] = DIOBJECTDATAFORMAT {
                pguid: guid,
                dw_ofs: (n * 4) as u32,
                dw_type: axis,
                dw_flags: DIDOI_ASPECTPOSITION,
            };
            i += 1;
        }
        for n in 0..MAX_POVS {
            objects[i] = DIOBJECTDATAFORMAT {
                pguid: &GUID_POV,
                dw_ofs: (32 + n * 4) as u32,
                dw_type: DIDFT_OPTIONAL | DIDFT_POV | DIDFT_ANYINSTANCE,
                dw_flags: 0,
            };
            i += 1;
        }
        for n in 0..MAX_BUTTONS {
            objects[i] = DIOBJECTDATAFORMAT {
                pguid: ptr::null(),
                dw_ofs: (48 + n) as u32,
                dw_type: DIDFT_OPTIONAL | DIDFT_BUTTON | DIDFT_ANYINSTANCE,
                dw_flags: 0,
            };
            i += 1;
        }

        let mut boxed = Box::new(Self {
            objects,
            format: DIDATAFORMAT {
                dw_size: size_of::<DIDATAFORMAT>() as u32,
                dw_obj_size: size_of::<DIOBJECTDATAFORMAT>() as u32,
                dw_flags: DIDF_ABSAXIS,
                dw_data_size: size_of::<DIJOYSTATE>() as u32,
                dw_num_objs: i as u32,
                rgodf: ptr::null(),
            },
        });
        boxed.format.rgodf = boxed.objects.as_ptr();
        boxed
    }
}

/// An opened `IDirectInputDevice8W`.
pub struct DirectInputDevice {
    raw: *mut IDirectInputDevice8W,
    // Held for the device's lifetime once negotiated.
    #[allow(dead_code)]
    format: Option<Box<JoystickDataFormat>>,
    // Dropped after `Drop::drop` releases `raw`.
    _lib: Rc<Library>,
}

impl DirectInputDevice {
    fn vtbl(&self) -> &IDirectInputDevice8WVtbl {
        // SAFETY: `raw` is a live COM object for as long as `self` exists.
        unsafe { &*(*self.raw).lpvtbl }
    }

    fn set_property(&mut self, prop: usize, header: &DIPROPHEADER) -> HRESULT {
        // SAFETY: `header` heads a complete property struct of `dw_size` bytes.
        unsafe { (self.vtbl().set_property)(self.raw, diprop(prop), header) }
    }
}

impl Drop for DirectInputDevice {
    fn drop(&mut self) {
        // SAFETY: released exactly once; unacquire on a non-acquired device is harmless.
        unsafe {
            (self.vtbl().unacquire)(self.raw);
            (self.vtbl().release)(self.raw);
        }
    }
}

fn classify_object(obj: &DIDEVICEOBJECTINSTANCEW) -> ObjectType {
    let kind = obj.dw_type & 0xff;
    if kind & DIDFT_AXIS != 0 {
        match obj.guid_type {
            g if g == GUID_XAXIS => ObjectType::XAxis,
            g if g == GUID_YAXIS => ObjectType::YAxis,
            g if g == GUID_ZAXIS => ObjectType::ZAxis,
            g if g == GUID_RXAXIS => ObjectType::RxAxis,
            g if g == GUID_RYAXIS => ObjectType::RyAxis,
            g if g == GUID_RZAXIS => ObjectType::RzAxis,
            g if g == GUID_SLIDER => ObjectType::Slider,
            _ => ObjectType::Unknown,
        }
    } else if kind & DIDFT_BUTTON != 0 {
        ObjectType::Button
    } else if kind & DIDFT_POV != 0 {
        ObjectType::Pov
    } else {
        ObjectType::Unknown
    }
}

unsafe extern "system" fn collect_object(
    object: *const DIDEVICEOBJECTINSTANCEW,
    context: *mut c_void,
) -> i32 {
    let out = &mut *(context as *mut Vec<DeviceObject>);
    let obj = &*object;
    out.push(DeviceObject {
        object_type: classify_object(obj),
        id: obj.dw_type,
    });
    DIENUM_CONTINUE
}

impl JoystickDevice for DirectInputDevice {
    fn set_report_layout(&mut self) -> Result<(), BackendError> {
        let format = JoystickDataFormat::new();
        // SAFETY: `format` is boxed and kept alive alongside the device.
        let hr = unsafe { (self.vtbl().set_data_format)(self.raw, &format.format) };
        check("SetDataFormat", hr)?;
        self.format = Some(format);
        Ok(())
    }

    fn set_absolute_axis_mode(&mut self) -> Result<(), BackendError> {
        let prop = DIPROPDWORD {
            diph: DIPROPHEADER {
                dw_size: size_of::<DIPROPDWORD>() as u32,
                dw_header_size: size_of::<DIPROPHEADER>() as u32,
                dw_obj: 0,
                dw_how: DIPH_DEVICE,
            },
            dw_data: DIPROPAXISMODE_ABS,
        };
        check("SetProperty(AXISMODE)", self.set_property(DIPROP_AXISMODE, &prop.diph))
    }

    fn objects(&mut self) -> Result<Vec<DeviceObject>, BackendError> {
        let mut found: Vec<DeviceObject> = Vec::new();
        // SAFETY: `found` outlives the synchronous enumeration.
        let hr = unsafe {
            (self.vtbl().enum_objects)(
                self.raw,
                collect_object,
                &mut found as *mut _ as *mut c_void,
                DIDFT_AXIS | DIDFT_BUTTON | DIDFT_POV,
            )
        };
        check("EnumObjects", hr)?;
        Ok(found)
    }

    fn set_axis_range(
        &mut self,
        object: &DeviceObject,
        min: i32,
        max: i32,
    ) -> Result<(), BackendError> {
        let prop = DIPROPRANGE {
            diph: DIPROPHEADER {
                dw_size: size_of::<DIPROPRANGE>() as u32,
                dw_header_size: size_of::<DIPROPHEADER>() as u32,
                dw_obj: object.id,
                dw_how: DIPH_BYID,
            },
            l_min: min,
            l_max: max,
        };
        check("SetProperty(RANGE)", self.set_property(DIPROP_RANGE, &prop.diph))
    }

    fn acquire(&mut self) -> Result<(), BackendError> {
        // SAFETY: plain COM call on a live device.
        check("Acquire", unsafe { (self.vtbl().acquire)(self.raw) })
    }

    fn poll(&mut self) -> Result<(), BackendError> {
        // SAFETY: plain COM call on a live device.
        check("Poll", unsafe { (self.vtbl().poll)(self.raw) })
    }

    fn read_state(&mut self) -> Result<JoyState, BackendError> {
        let mut state = DIJOYSTATE::default();
        // SAFETY: `state` matches the negotiated data format size.
        let hr = unsafe {
            (self.vtbl().get_device_state)(
                self.raw,
                size_of::<DIJOYSTATE>() as u32,
                &mut state as *mut _ as *mut c_void,
            )
        };
        check("GetDeviceState", hr)?;
        Ok(JoyState::from(&state))
    }
}

