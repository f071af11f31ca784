use anyhow::Result;
use chrono::Local;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use super::CaptureState;
use crate::codec::{self, ACTIVITY_NAME, USERNAME};
use crate::core::{FrozenBuffer, SampleBuffer, SensorChannel, SessionMetadata};
use crate::error::{CaptureError, TransportError};
use crate::hal::{SensorSource, WakeGuard, WakeLock};
use crate::transport::TransferClient;

/// Time given to the user to position the device before sampling starts
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

const MINUTE: Duration = Duration::from_secs(60);
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Timed,
    Manual,
}

/// Fate of the session payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Sent,
    /// The payload was dropped; it is not retried
    Failed(TransportError),
    /// Timed session torn down before its timer fired; nothing was sent
    Cancelled,
}

/// Progress notifications for the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(CaptureState),
    CapabilityUnavailable(SensorChannel),
    TransferSent { accel_records: usize, gyro_records: usize },
    TransferFailed(TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub metadata: SessionMetadata,
    pub stop_reason: StopReason,
    pub accel_records: usize,
    pub gyro_records: usize,
    pub outcome: TransferOutcome,
}

/// Runs capture sessions on the wearable, one at a time
pub struct CaptureScheduler {
    sensors: Arc<dyn SensorSource>,
    wake_lock: Arc<dyn WakeLock>,
    client: TransferClient,
    settle_delay: Duration,
    active: Arc<AtomicBool>,
}

impl CaptureScheduler {
    pub fn new(sensors: Arc<dyn SensorSource>, wake_lock: Arc<dyn WakeLock>, client: TransferClient) -> Self {
        Self {
            sensors,
            wake_lock,
            client,
            settle_delay: DEFAULT_SETTLE_DELAY,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a capture session in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, metadata: SessionMetadata) -> Result<SessionHandle, CaptureError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CaptureError::SessionActive);
        }
        let slot = ActiveSlot(self.active.clone());

        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(CaptureState::Idle);
        let (events_tx, events_rx) = broadcast::channel(EVENT_CAPACITY);

        let session = Session {
            sensors: self.sensors.clone(),
            wake_lock: self.wake_lock.clone(),
            client: self.client.clone(),
            settle_delay: self.settle_delay,
            metadata,
            stop_rx,
            state_tx,
            events: events_tx.clone(),
        };

        let join = tokio::spawn(async move {
            let _slot = slot;
            session.run().await
        });

        Ok(SessionHandle {
            stop_tx,
            state_rx,
            events_tx,
            events_rx: Some(events_rx),
            join,
        })
    }

    /// Publish the device's sensor list to the companion
    pub async fn advertise_sensors(&self) -> Result<(), TransportError> {
        let sensors = self.sensors.describe_sensors();
        debug!("Advertising {} sensors", sensors.len());
        self.client.advertise_sensors(&sensors).await
    }
}

/// Clears the scheduler's active flag when the session task ends
struct ActiveSlot(Arc<AtomicBool>);

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Control handle for a running session.
///
/// Dropping the handle of a manual session stops it. A timed session keeps
/// running until its timer fires.
pub struct SessionHandle {
    stop_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<CaptureState>,
    events_tx: broadcast::Sender<SessionEvent>,
    events_rx: Option<broadcast::Receiver<SessionEvent>>,
    join: JoinHandle<SessionReport>,
}

impl SessionHandle {
    /// Session-stop command
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn state(&self) -> CaptureState {
        *self.state_rx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<CaptureState> {
        self.state_rx.clone()
    }

    /// Event stream for this session. The first call sees every event since start.
    pub fn subscribe_events(&mut self) -> broadcast::Receiver<SessionEvent> {
        self.events_rx
            .take()
            .unwrap_or_else(|| self.events_tx.subscribe())
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the session to flush and return its report
    pub async fn wait(self) -> Result<SessionReport> {
        let SessionHandle { stop_tx, join, .. } = self;
        let report = join.await?;
        drop(stop_tx);
        Ok(report)
    }
}

struct Session {
    sensors: Arc<dyn SensorSource>,
    wake_lock: Arc<dyn WakeLock>,
    client: TransferClient,
    settle_delay: Duration,
    metadata: SessionMetadata,
    stop_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<CaptureState>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    async fn run(mut self) -> SessionReport {
        let timed = self.metadata.timed_mode;
        info!(
            "Session started. Sampling rate: {:?}, minutes: {}, timed: {}",
            self.metadata.sampling_rate, self.metadata.duration_minutes, timed
        );

        let mut wake = WakeGuard::acquire(self.wake_lock.clone());
        self.transition(CaptureState::WakeAcquired);

        let accel = SampleBuffer::new(SensorChannel::Accelerometer);
        let gyro = SampleBuffer::new(SensorChannel::Gyroscope);

        self.transition(CaptureState::Delayed);
        debug!("Before start: {}", Local::now().timestamp_millis());
        let early_stop = tokio::select! {
            _ = sleep(self.settle_delay) => false,
            _ = stop_requested(&mut self.stop_rx, timed) => true,
        };

        let mut active = Vec::new();
        let stop_reason = if early_stop {
            info!("Stopped during settling delay");
            StopReason::Manual
        } else {
            self.transition(CaptureState::Sampling);
            for buffer in [&accel, &gyro] {
                if self.activate(buffer).await {
                    active.push(buffer.channel());
                }
            }
            info!("Start: {}", Local::now().timestamp_millis());
            self.wait_for_stop(timed).await
        };

        // Subscriptions go down before the buffers are touched.
        for channel in active {
            self.sensors.unsubscribe(channel).await;
        }
        info!("End: {}", Local::now().timestamp_millis());
        self.transition(match stop_reason {
            StopReason::Timed => CaptureState::TimedStop,
            StopReason::Manual => CaptureState::ManualStop,
        });

        let accel = accel.freeze();
        let gyro = gyro.freeze();
        self.transition(CaptureState::Flushing);

        let outcome = if timed && stop_reason == StopReason::Manual {
            info!("Timed session torn down early, discarding {} + {} records", accel.len(), gyro.len());
            TransferOutcome::Cancelled
        } else {
            self.transfer(&accel, &gyro).await
        };

        wake.release();
        self.transition(CaptureState::Idle);

        SessionReport {
            metadata: self.metadata.clone(),
            stop_reason,
            accel_records: accel.len(),
            gyro_records: gyro.len(),
            outcome,
        }
    }

    async fn wait_for_stop(&mut self, timed: bool) -> StopReason {
        if !timed {
            stop_requested(&mut self.stop_rx, false).await;
            return StopReason::Manual;
        }

        let duration = MINUTE * self.metadata.duration_minutes;
        tokio::select! {
            _ = sleep(duration) => StopReason::Timed,
            _ = stop_requested(&mut self.stop_rx, true) => StopReason::Manual,
        }
    }

    /// Subscribe one channel. Absent sensors are skipped.
    async fn activate(&self, buffer: &SampleBuffer) -> bool {
        debug_assert!(self.state_tx.borrow().is_sampling(), "sensor activated outside Sampling");
        let channel = buffer.channel();
        if !self.sensors.has_capability(channel) {
            info!("No {} on this device, skipping", channel);
            self.emit(SessionEvent::CapabilityUnavailable(channel));
            return false;
        }

        match self
            .sensors
            .subscribe(channel, self.metadata.sampling_rate, buffer.sink())
            .await
        {
            Ok(()) => true,
            Err(CaptureError::CapabilityUnavailable(_)) => {
                info!("No {} on this device, skipping", channel);
                self.emit(SessionEvent::CapabilityUnavailable(channel));
                false
            }
            Err(e) => {
                warn!("Failed to activate {}: {}", channel, e);
                false
            }
        }
    }

    async fn transfer(&self, accel: &FrozenBuffer, gyro: &FrozenBuffer) -> TransferOutcome {
        let mut metadata = HashMap::new();
        if let Some(username) = &self.metadata.username {
            metadata.insert(USERNAME.to_string(), username.clone());
        }
        if let Some(activity_name) = &self.metadata.activity_name {
            metadata.insert(ACTIVITY_NAME.to_string(), activity_name.clone());
        }

        let payload = codec::encode(accel, gyro, metadata);
        match self.client.send_payload(payload).await {
            Ok(()) => {
                info!("Sent {} accelerometer and {} gyroscope records", accel.len(), gyro.len());
                self.emit(SessionEvent::TransferSent {
                    accel_records: accel.len(),
                    gyro_records: gyro.len(),
                });
                TransferOutcome::Sent
            }
            Err(e) => {
                warn!("Transfer failed, session data dropped: {}", e);
                self.emit(SessionEvent::TransferFailed(e.clone()));
                TransferOutcome::Failed(e)
            }
        }
    }

    fn transition(&self, next: CaptureState) {
        let previous = self.state_tx.send_replace(next);
        debug_assert!(
            previous.can_transition_to(&next),
            "invalid capture transition {} -> {}",
            previous,
            next
        );
        debug!("Capture state {} -> {}", previous, next);
        self.emit(SessionEvent::StateChanged(next));
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

/// Resolves when a stop is requested. A dropped handle counts as a stop
/// only for manual sessions.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>, timed: bool) {
    let closed = stop_rx.wait_for(|stop| *stop).await.is_err();
    if closed && timed {
        std::future::pending::<()>().await;
    }
}
