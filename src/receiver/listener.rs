use async_trait::async_trait;
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::codec::TransferPayload;
use crate::core::SensorChannel;
use crate::error::DecodeError;
use crate::hal::SensorDescriptor;
use crate::observability::ReceiverMetrics;
use crate::persistence::PersistenceWriter;
use crate::transport::{
    DataEvent, DataListener, DataMap, EventKind, DATA_PATH, SENSOR_CODES, SENSOR_LIST,
    WATCH_SENSORS_PATH,
};

/// Result of persisting one channel of a received session
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelOutcome {
    Written { path: PathBuf, records: usize },
    DecodeFailed(DecodeError),
    WriteFailed(String),
}

/// What the listener did with one inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum EventReport {
    Session {
        username: String,
        activity_name: String,
        channels: Vec<(SensorChannel, ChannelOutcome)>,
    },
    SensorList(Vec<SensorDescriptor>),
    Ignored { path: String },
}

impl EventReport {
    pub fn outcome(&self, channel: SensorChannel) -> Option<&ChannelOutcome> {
        match self {
            Self::Session { channels, .. } => channels
                .iter()
                .find(|(c, _)| *c == channel)
                .map(|(_, outcome)| outcome),
            _ => None,
        }
    }
}

/// Companion-side consumer of wearable payloads.
///
/// File I/O runs on the blocking pool, one task per event, so a large
/// session never stalls the runtime that delivers it.
pub struct ListenerService {
    inner: Arc<Persister>,
    reports: Mutex<VecDeque<EventReport>>,
}

#[derive(Clone)]
struct Persister {
    writer: PersistenceWriter,
    default_username: String,
    default_activity: String,
    metrics: Arc<ReceiverMetrics>,
}

/// Reports kept for `take_reports`; older ones are dropped first
const MAX_PENDING_REPORTS: usize = 256;

impl ListenerService {
    pub fn new(writer: PersistenceWriter) -> Self {
        Self {
            inner: Arc::new(Persister {
                writer,
                default_username: "unknown".to_string(),
                default_activity: "unknown".to_string(),
                metrics: Arc::new(ReceiverMetrics::new()),
            }),
            reports: Mutex::new(VecDeque::new()),
        }
    }

    /// Labels used when a payload carries no user/activity metadata
    pub fn with_default_labels(mut self, username: impl Into<String>, activity_name: impl Into<String>) -> Self {
        let inner = Arc::make_mut(&mut self.inner);
        inner.default_username = username.into();
        inner.default_activity = activity_name.into();
        self
    }

    pub fn metrics(&self) -> Arc<ReceiverMetrics> {
        self.inner.metrics.clone()
    }

    /// Drain the reports of events handled since the last call, oldest first
    pub fn take_reports(&self) -> Vec<EventReport> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect()
    }

    /// Handle one event on the calling thread. Blocks on file I/O.
    pub fn handle_event(&self, event: &DataEvent) -> EventReport {
        self.inner.handle_event_at(event, &Local::now())
    }

    pub fn handle_event_at(&self, event: &DataEvent, now: &DateTime<Local>) -> EventReport {
        self.inner.handle_event_at(event, now)
    }

    fn push_report(&self, report: EventReport) {
        let mut reports = self.reports.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if reports.len() >= MAX_PENDING_REPORTS {
            reports.pop_front();
        }
        reports.push_back(report);
    }
}

impl Persister {
    fn handle_event_at(&self, event: &DataEvent, now: &DateTime<Local>) -> EventReport {
        self.metrics.record_event();

        if event.kind != EventKind::Changed {
            return EventReport::Ignored {
                path: event.path().to_string(),
            };
        }

        match event.path() {
            DATA_PATH => self.persist_session(&event.item.data, now),
            WATCH_SENSORS_PATH => EventReport::SensorList(log_sensor_list(&event.item.data)),
            other => {
                debug!("Ignoring data item at {}", other);
                EventReport::Ignored {
                    path: other.to_string(),
                }
            }
        }
    }

    fn persist_session(&self, data: &DataMap, now: &DateTime<Local>) -> EventReport {
        let payload = TransferPayload::from_data_map(data.clone());
        let username = payload
            .username()
            .unwrap_or(self.default_username.as_str())
            .to_string();
        let activity_name = payload
            .activity_name()
            .unwrap_or(self.default_activity.as_str())
            .to_string();

        let channels = SensorChannel::ALL
            .iter()
            .map(|&channel| {
                let outcome = self.persist_channel(&payload, channel, &username, &activity_name, now);
                (channel, outcome)
            })
            .collect();

        EventReport::Session {
            username,
            activity_name,
            channels,
        }
    }

    fn persist_channel(
        &self,
        payload: &TransferPayload,
        channel: SensorChannel,
        username: &str,
        activity_name: &str,
        now: &DateTime<Local>,
    ) -> ChannelOutcome {
        let records = match payload.decode_channel(channel) {
            Ok(records) => records,
            Err(e) => {
                warn!("Skipping {} data from {}/{}: {}", channel, username, activity_name, e);
                self.metrics.record_decode_error();
                return ChannelOutcome::DecodeFailed(e);
            }
        };

        match self
            .writer
            .write_session(channel.file_label(), username, activity_name, &records, now)
        {
            Ok(path) => {
                self.metrics.record_file_written(records.len());
                ChannelOutcome::Written {
                    path,
                    records: records.len(),
                }
            }
            Err(e) => {
                error!("Error writing {} file: {}", channel, e);
                self.metrics.record_write_error();
                ChannelOutcome::WriteFailed(e.to_string())
            }
        }
    }
}

fn log_sensor_list(data: &DataMap) -> Vec<SensorDescriptor> {
    let (Some(names), Some(codes)) = (data.string_list(SENSOR_LIST), data.int_list(SENSOR_CODES)) else {
        warn!("Sensor list event without {} / {}", SENSOR_LIST, SENSOR_CODES);
        return Vec::new();
    };
    if names.len() != codes.len() {
        warn!("Sensor list has {} names but {} codes", names.len(), codes.len());
    }

    names
        .iter()
        .zip(codes)
        .map(|(name, code)| {
            info!("Name: {} Code: {}", name, code);
            SensorDescriptor {
                name: name.clone(),
                code: *code,
            }
        })
        .collect()
}

#[async_trait]
impl DataListener for ListenerService {
    async fn on_data_changed(&self, events: &[DataEvent]) {
        debug!("on_data_changed called with {} events", events.len());
        for event in events {
            let inner = self.inner.clone();
            let event = event.clone();
            let path = event.path().to_string();
            let handled =
                tokio::task::spawn_blocking(move || inner.handle_event_at(&event, &Local::now())).await;
            match handled {
                Ok(report) => self.push_report(report),
                Err(e) => error!("Handler for {} event failed: {}", path, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::core::Record;
    use crate::transport::DataItem;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_missing_labels_use_defaults() {
        let dir = tempdir().unwrap();
        let service = ListenerService::new(PersistenceWriter::new(dir.path()))
            .with_default_labels("anon", "free");

        let payload = codec::encode(&[Record::new(1, 1.0, 2.0, 3.0)], &[], HashMap::new());
        let event = DataEvent::changed(DataItem::new(DATA_PATH, payload.into_data_map()));

        match service.handle_event(&event) {
            EventReport::Session { username, activity_name, channels } => {
                assert_eq!(username, "anon");
                assert_eq!(activity_name, "free");
                assert_eq!(channels.len(), 2);
            }
            other => panic!("unexpected report {:?}", other),
        }
        assert!(dir.path().join("anon").join("free").is_dir());
    }

    #[test]
    fn test_sensor_list_is_reported_not_persisted() {
        let dir = tempdir().unwrap();
        let service = ListenerService::new(PersistenceWriter::new(dir.path()));

        let mut data = DataMap::new();
        data.put_string_list(SENSOR_LIST, vec!["accelerometer".to_string(), "gyroscope".to_string()]);
        data.put_int_list(SENSOR_CODES, vec![1, 4]);
        let event = DataEvent::changed(DataItem::new(WATCH_SENSORS_PATH, data));

        let report = service.handle_event(&event);
        assert_eq!(
            report,
            EventReport::SensorList(vec![
                SensorDescriptor { name: "accelerometer".to_string(), code: 1 },
                SensorDescriptor { name: "gyroscope".to_string(), code: 4 },
            ])
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_deleted_and_unknown_events_ignored() {
        let dir = tempdir().unwrap();
        let service = ListenerService::new(PersistenceWriter::new(dir.path()));

        let deleted = DataEvent {
            kind: EventKind::Deleted,
            item: DataItem::new(DATA_PATH, DataMap::new()),
        };
        let unknown = DataEvent::changed(DataItem::new("/other", DataMap::new()));

        assert!(matches!(service.handle_event(&deleted), EventReport::Ignored { .. }));
        assert!(matches!(service.handle_event(&unknown), EventReport::Ignored { .. }));
        assert_eq!(service.metrics().snapshot().events_processed, 2);
    }

    fn unknown_event() -> DataEvent {
        DataEvent::changed(DataItem::new("/other", DataMap::new()))
    }

    #[tokio::test]
    async fn test_take_reports_drains() {
        let dir = tempdir().unwrap();
        let service = ListenerService::new(PersistenceWriter::new(dir.path()));

        service.on_data_changed(&[unknown_event(), unknown_event()]).await;
        assert_eq!(service.take_reports().len(), 2);
        assert!(service.take_reports().is_empty());

        service.on_data_changed(&[unknown_event()]).await;
        assert_eq!(service.take_reports().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_reports_are_capped() {
        let dir = tempdir().unwrap();
        let service = ListenerService::new(PersistenceWriter::new(dir.path()));

        let events: Vec<_> = (0..MAX_PENDING_REPORTS + 10).map(|_| unknown_event()).collect();
        service.on_data_changed(&events).await;

        assert_eq!(service.take_reports().len(), MAX_PENDING_REPORTS);
        assert_eq!(
            service.metrics().snapshot().events_processed,
            (MAX_PENDING_REPORTS + 10) as u64
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_large_session_write_does_not_stall_runtime() {
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

        let dir = tempdir().unwrap();
        let service = ListenerService::new(PersistenceWriter::new(dir.path()));

        let records: Vec<Record> = (0..200_000)
            .map(|i| Record::new(i, i as f64 * 0.5, -1.25, 9.81))
            .collect();
        let payload = codec::encode(&records, &records, HashMap::new());
        let event = DataEvent::changed(DataItem::new(DATA_PATH, payload.into_data_map()));

        let ticks = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicBool::new(false));
        let ticker = {
            let ticks = ticks.clone();
            let done = done.clone();
            tokio::spawn(async move {
                while !done.load(Ordering::SeqCst) {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };
        tokio::task::yield_now().await;
        let before = ticks.load(Ordering::SeqCst);

        service.on_data_changed(&[event]).await;
        let during = ticks.load(Ordering::SeqCst) - before;
        done.store(true, Ordering::SeqCst);
        ticker.await.unwrap();

        assert!(during > 0, "runtime made no progress while the session was written");
        let reports = service.take_reports();
        assert!(matches!(
            reports[0].outcome(SensorChannel::Gyroscope),
            Some(ChannelOutcome::Written { records: 200_000, .. })
        ));
    }
}
