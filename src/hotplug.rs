//! Device-change notification.
//!
//! The host window's message dispatch runs on the input thread, possibly nested
//! inside arbitrary call stacks. All it may do is set a flag: the arbiter reads and
//! clears that flag once per tick and re-runs discovery itself.
//!
//! ```text
//! window proc ──WM_DEVICECHANGE──▶ DeviceChangeNotifier::notify()   (store)
//! update()    ──────────────────▶ DeviceChangeFlag::take()          (swap)
//! ```
//!
//! The flag is owned by the arbiter; hooks only ever hold a [`DeviceChangeNotifier`].

use crate::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// `WM_DEVICECHANGE`: device topology changed.
pub const WM_DEVICECHANGE: u32 = 0x0219;

/// Sticky "devices changed" flag, owned by the arbiter.
#[derive(Debug, Default)]
pub struct DeviceChangeFlag {
    inner: Arc<AtomicBool>,
}

impl DeviceChangeFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the message hook.
    pub fn notifier(&self) -> DeviceChangeNotifier {
        DeviceChangeNotifier {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Non-blocking check. A single atomic load.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Set the flag directly (used to schedule the first discovery pass).
    #[inline]
    pub fn arm(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// Read and clear in one step.
    ///
    /// A notification arriving after this call is kept for the next tick.
    #[inline]
    pub fn take(&self) -> bool {
        self.inner.swap(false, Ordering::AcqRel)
    }
}

/// Write side of a [`DeviceChangeFlag`]. Cheap to clone; safe to call from any thread.
#[derive(Clone, Debug)]
pub struct DeviceChangeNotifier {
    inner: Arc<AtomicBool>,
}

impl DeviceChangeNotifier {
    #[inline]
    pub fn notify(&self) {
        self.inner.store(true, Ordering::Release);
    }
}

/// Inspect one window message. Returns `true` if it was a device-change message.
///
/// The caller forwards every message to the original handler regardless.
#[inline]
pub fn dispatch_message(msg: u32, notifier: &DeviceChangeNotifier) -> bool {
    if msg == WM_DEVICECHANGE {
        notifier.notify();
        true
    } else {
        false
    }
}

/// Interception point on the host window's message dispatch.
///
/// Implementations install at most once. `install` returns `Ok(false)` when there is
/// nothing to hook yet (no active window), so the arbiter retries on a later tick.
pub trait MessageHook {
    fn install(&mut self, notifier: DeviceChangeNotifier) -> Result<bool, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_sets_flag_and_take_clears_it() {
        let flag = DeviceChangeFlag::new();
        assert!(!flag.is_set());
        flag.notifier().notify();
        assert!(flag.is_set());
        assert!(flag.take());
        assert!(!flag.is_set());
        assert!(!flag.take());
    }

    #[test]
    fn only_device_change_messages_set_the_flag() {
        let flag = DeviceChangeFlag::new();
        let n = flag.notifier();
        const WM_PAINT: u32 = 0x000F;
        assert!(!dispatch_message(WM_PAINT, &n));
        assert!(!flag.is_set());
        assert!(dispatch_message(WM_DEVICECHANGE, &n));
        assert!(flag.is_set());
    }

    #[test]
    fn notifier_works_across_threads() {
        let flag = DeviceChangeFlag::new();
        let n = flag.notifier();
        std::thread::spawn(move || n.notify()).join().unwrap();
        assert!(flag.take());
    }
}
