//! SDL-style device fingerprints.
//!
//! A [`Fingerprint`] is the 16-byte identity community controller-mapping tables
//! (SDL_GameControllerDB) key their entries on. It renders as 32 lower-case hex
//! characters.
//!
//! Layouts produced here:
//!
//! | source | bytes |
//! |---|---|
//! | vendor/product known | `03 00 00 00` `vid lo` `vid hi` `00 00` `pid lo` `pid hi` `00 * 6` |
//! | name only | `05 00 00 00` first 12 bytes of the UTF-8 name, zero padded |
//! | slot API | `"xinput"` (6 ASCII bytes) `subtype` `00 * 9` |
//!
//! The version word is always zero; mapping databases list these devices that way.

use crate::backends::Guid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Bus tag for devices identified by vendor/product (USB).
pub const BUS_USB: u8 = 0x03;
/// Bus tag for devices identified by name only (Bluetooth in SDL's numbering).
pub const BUS_BLUETOOTH: u8 = 0x05;

/// Length of the name-derived section.
const NAME_BYTES: usize = 12;

/// Marker DirectInput places in `guidProduct.Data4[2..8]` when `Data1` carries VID/PID.
const PIDVID_MARKER: &[u8; 6] = b"PIDVID";

/// 16-byte device identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    #[inline]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Fingerprint for a device whose vendor and product ids are known.
    pub fn from_vid_pid(vendor_id: u16, product_id: u16) -> Self {
        let mut b = [0u8; 16];
        b[0] = BUS_USB;
        b[4..6].copy_from_slice(&vendor_id.to_le_bytes());
        b[8..10].copy_from_slice(&product_id.to_le_bytes());
        Self(b)
    }

    /// Fingerprint derived from a device name (first 12 UTF-8 bytes, zero padded).
    pub fn from_name(name: &str) -> Self {
        let mut b = [0u8; 16];
        b[0] = BUS_BLUETOOTH;
        for (dst, src) in b[4..].iter_mut().zip(name.as_bytes().iter().take(NAME_BYTES)) {
            *dst = *src;
        }
        Self(b)
    }

    /// Fingerprint for a slot-API controller of the given device subtype.
    pub fn for_slot(subtype: u8) -> Self {
        let mut b = [0u8; 16];
        b[..6].copy_from_slice(b"xinput");
        b[6] = subtype;
        Self(b)
    }

    /// Fingerprint for an enumerated joystick.
    ///
    /// Uses the vendor/product layout when the product GUID carries the
    /// `PIDVID` marker, and the name layout otherwise.
    pub fn for_joystick(product: &Guid, name: &str) -> Self {
        match vid_pid_from_product_guid(product) {
            Some((vid, pid)) => Self::from_vid_pid(vid, pid),
            None => Self::from_name(name),
        }
    }

    /// Lower-case 32-character hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Vendor and product ids packed into a DirectInput product GUID, if present.
///
/// `Data1` holds `vid | pid << 16` when `Data4[2..8]` reads `PIDVID`.
pub fn vid_pid_from_product_guid(product: &Guid) -> Option<(u16, u16)> {
    if product.data4.get(2..8)? != PIDVID_MARKER {
        return None;
    }
    let vid = (product.data1 & 0xffff) as u16;
    let pid = (product.data1 >> 16) as u16;
    Some((vid, pid))
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Error returned when parsing a fingerprint from hex.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("fingerprint must be 32 hex characters: {0}")]
pub struct ParseFingerprintError(String);

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ParseFingerprintError(e.to_string()))?;
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| ParseFingerprintError(format!("got {} bytes", v.len())))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
