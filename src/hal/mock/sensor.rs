use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::time::{interval, Duration, Instant};

use crate::core::{Record, SampleSink, SamplingRate, SensorChannel};
use crate::error::CaptureError;
use crate::hal::SensorSource;

/// Calls observed by a [`SimulatedSensorSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorCall {
    Subscribe(SensorChannel, SamplingRate),
    Unsubscribe(SensorChannel),
}

/// Subscribed sinks, tagged with the generation of the subscription that
/// installed them
type SinkMap = Arc<Mutex<HashMap<SensorChannel, (u64, SampleSink)>>>;

/// In-process sensor capability.
///
/// Samples are either injected with [`emit`](Self::emit) or, in periodic
/// mode, generated as a sine wave while a channel is subscribed.
pub struct SimulatedSensorSource {
    capabilities: HashSet<SensorChannel>,
    sinks: SinkMap,
    calls: Mutex<Vec<SensorCall>>,
    period: Option<Duration>,
    generation: AtomicU64,
    active_tx: watch::Sender<usize>,
}

impl SimulatedSensorSource {
    /// Device with both accelerometer and gyroscope
    pub fn new() -> Self {
        Self::with_capabilities(&SensorChannel::ALL)
    }

    pub fn with_capabilities(channels: &[SensorChannel]) -> Self {
        let (active_tx, _) = watch::channel(0);
        Self {
            capabilities: channels.iter().copied().collect(),
            sinks: Arc::new(Mutex::new(HashMap::new())),
            calls: Mutex::new(Vec::new()),
            period: None,
            generation: AtomicU64::new(0),
            active_tx,
        }
    }

    /// Generate one sample per `period` on every subscribed channel
    pub fn periodic(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    /// Deliver a sample as the platform would. Returns false if the channel
    /// is not subscribed or its buffer is frozen.
    pub fn emit(&self, channel: SensorChannel, record: Record) -> bool {
        let sinks = self.sinks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match sinks.get(&channel) {
            Some((_, sink)) => sink.on_sample(record),
            None => false,
        }
    }

    pub fn is_subscribed(&self, channel: SensorChannel) -> bool {
        self.sinks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&channel)
    }

    pub fn active_subscriptions(&self) -> usize {
        *self.active_tx.borrow()
    }

    /// Wait until at least `count` channels are subscribed
    pub async fn wait_for_subscriptions(&self, count: usize) {
        let mut rx = self.active_tx.subscribe();
        let _ = rx.wait_for(|active| *active >= count).await;
    }

    /// Wait until every channel is unsubscribed
    pub async fn wait_for_idle(&self) {
        let mut rx = self.active_tx.subscribe();
        let _ = rx.wait_for(|active| *active == 0).await;
    }

    pub fn calls(&self) -> Vec<SensorCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record_call(&self, call: SensorCall) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }

    /// The generator exits once its subscription is gone or superseded
    fn spawn_generator(&self, channel: SensorChannel, generation: u64, period: Duration) {
        let sinks = self.sinks.clone();
        let started = Instant::now();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            let omega = 2.0 * PI;
            loop {
                ticker.tick().await;
                let elapsed = started.elapsed();
                let phase = omega * elapsed.as_secs_f64();
                let record = Record::new(
                    elapsed.as_nanos() as i64,
                    phase.sin(),
                    phase.cos(),
                    9.81,
                );

                let guard = sinks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                match guard.get(&channel) {
                    Some((current, sink)) if *current == generation && sink.on_sample(record) => {}
                    _ => break,
                }
            }
        });
    }
}

impl Default for SimulatedSensorSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorSource for SimulatedSensorSource {
    fn has_capability(&self, channel: SensorChannel) -> bool {
        self.capabilities.contains(&channel)
    }

    async fn subscribe(
        &self,
        channel: SensorChannel,
        rate: SamplingRate,
        sink: SampleSink,
    ) -> Result<(), CaptureError> {
        if !self.has_capability(channel) {
            return Err(CaptureError::CapabilityUnavailable(channel));
        }
        self.record_call(SensorCall::Subscribe(channel, rate));

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inserted = self
            .sinks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(channel, (generation, sink))
            .is_none();
        if inserted {
            self.active_tx.send_modify(|active| *active += 1);
        }

        if let Some(period) = self.period {
            self.spawn_generator(channel, generation, period);
        }
        Ok(())
    }

    async fn unsubscribe(&self, channel: SensorChannel) {
        self.record_call(SensorCall::Unsubscribe(channel));
        let removed = self
            .sinks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&channel)
            .is_some();
        if removed {
            self.active_tx.send_modify(|active| *active -= 1);
        }
    }
}
