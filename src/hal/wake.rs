use log::debug;
use std::sync::Arc;

use super::WakeLock;

/// Scoped hold on a [`WakeLock`].
///
/// Released exactly once: either by [`WakeGuard::release`] or on drop.
pub struct WakeGuard {
    lock: Arc<dyn WakeLock>,
    held: bool,
}

impl WakeGuard {
    pub fn acquire(lock: Arc<dyn WakeLock>) -> Self {
        lock.acquire();
        debug!("wake lock acquired");
        Self { lock, held: true }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        self.held = false;
        if self.lock.is_held() {
            self.lock.release();
            debug!("wake lock released");
        }
    }
}

impl Drop for WakeGuard {
    fn drop(&mut self) {
        self.release();
    }
}
