use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

use super::{Channel, DataEvent, DataItem, DataListener};
use crate::error::TransportError;

/// In-memory link joining a wearable and a companion in one process.
///
/// Items put on the channel are delivered to matching listeners as
/// single-event batches before `put` returns.
pub struct LoopbackChannel {
    reachable: AtomicBool,
    connect_delay: Mutex<Duration>,
    open_connections: AtomicUsize,
    connect_attempts: AtomicUsize,
    disconnects: AtomicUsize,
    items: Mutex<Vec<DataItem>>,
    listeners: Mutex<Vec<(String, Arc<dyn DataListener>)>>,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            connect_delay: Mutex::new(Duration::ZERO),
            open_connections: AtomicUsize::new(0),
            connect_attempts: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            items: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Simulate the companion going out of range
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Delay applied to every connection attempt
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = delay;
    }

    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    /// Connection attempts, successful or not
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Items accepted so far, oldest first
    pub fn items(&self) -> Vec<DataItem> {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Deliver a batch of events to listeners, bypassing the connection.
    ///
    /// Each listener receives the events matching its path as one batch.
    pub async fn deliver(&self, events: Vec<DataEvent>) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for (path, listener) in listeners {
            let batch: Vec<DataEvent> = events
                .iter()
                .filter(|event| event.path() == path)
                .cloned()
                .collect();
            if !batch.is_empty() {
                listener.on_data_changed(&batch).await;
            }
        }
    }
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for LoopbackChannel {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.connect_delay.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !delay.is_zero() {
            sleep(delay).await;
        }
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable);
        }
        self.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn put(&self, item: DataItem) -> Result<(), TransportError> {
        if self.open_connections.load(Ordering::SeqCst) == 0 {
            return Err(TransportError::Rejected {
                path: item.path,
                reason: "not connected".to_string(),
            });
        }
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(item.clone());

        self.deliver(vec![DataEvent::changed(item)]).await;
        Ok(())
    }

    async fn disconnect(&self) {
        let closed = self
            .open_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |open| open.checked_sub(1))
            .is_ok();
        if closed {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn subscribe(&self, path: &str, listener: Arc<dyn DataListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((path.to_string(), listener));
    }
}
