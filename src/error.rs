//! Error types.
//!
//! Two layers:
//! - [`BackendError`] is what a single native call reports (DirectInput HRESULTs,
//!   XInput error codes, fake backends in tests). It is `Copy` and cheap to classify.
//! - [`Error`] is what the crate surfaces to the host. It is `Clone` because the
//!   arbiter keeps a sticky discovery error and hands it back on every later call.
//!
//! Expected device churn is not an error: a transient `NotAcquired`/`InputLost`
//! is retried once and then treated as a disconnect, and `NotConnected` on a slot
//! probe simply means the slot is empty.

use crate::registry::GamepadId;
use thiserror::Error;

/// Failure reported by one backend call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The device lost (or never had) acquisition. Transient.
    #[error("device is not acquired")]
    NotAcquired,

    /// Input was lost to another application or the device went away. Transient.
    #[error("device input was lost")]
    InputLost,

    /// The device or slot is not connected.
    #[error("device is not connected")]
    NotConnected,

    /// A device object could not be classified. Only that object is skipped.
    #[error("unrecognized device object")]
    UnrecognizedObject,

    /// Any other native failure.
    #[error("{call} failed with code {code:#010x}")]
    Native { call: &'static str, code: u32 },
}

impl BackendError {
    /// `true` for acquisition races that are worth one re-acquire-and-retry cycle.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::NotAcquired | BackendError::InputLost)
    }
}

/// Crate-level error.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Error {
    /// A whole backend is missing on this host. Non-fatal: the backend is skipped.
    #[error("{backend} backend is unavailable on this host")]
    BackendUnavailable { backend: &'static str },

    /// Unexpected failure while enumerating devices or walking capabilities.
    ///
    /// Sticky: the arbiter returns it from every subsequent call until
    /// [`NativeGamepads::clear_error`](crate::native::NativeGamepads::clear_error).
    #[error("device discovery failed while trying to {stage}: {source}")]
    Discovery {
        stage: &'static str,
        #[source]
        source: BackendError,
    },

    /// A non-transient failure while polling one device. The device is removed.
    #[error("polling gamepad {id} failed: {source}")]
    Poll {
        id: GamepadId,
        #[source]
        source: BackendError,
    },

    /// The device-change message hook could not be installed.
    #[error("device-change hook: {0}")]
    Hook(String),

    /// Configuration could not be parsed or is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn discovery(stage: &'static str, source: BackendError) -> Self {
        Error::Discovery { stage, source }
    }
}
