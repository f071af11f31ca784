use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the companion-side listener
#[derive(Debug, Default)]
pub struct ReceiverMetrics {
    events_processed: AtomicU64,
    files_written: AtomicU64,
    records_written: AtomicU64,
    decode_errors: AtomicU64,
    write_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReceiverSnapshot {
    pub events_processed: u64,
    pub files_written: u64,
    pub records_written: u64,
    pub decode_errors: u64,
    pub write_errors: u64,
}

impl ReceiverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_written(&self, records: usize) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
        self.records_written.fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReceiverSnapshot {
        ReceiverSnapshot {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}
