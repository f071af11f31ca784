use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::hal::WakeLock;

/// Wake lock that counts platform calls
#[derive(Debug, Default)]
pub struct CountingWakeLock {
    held: AtomicBool,
    acquires: AtomicUsize,
    releases: AtomicUsize,
}

impl CountingWakeLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire_count(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl WakeLock for CountingWakeLock {
    fn acquire(&self) {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        self.held.store(true, Ordering::SeqCst);
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.held.store(false, Ordering::SeqCst);
    }

    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}
