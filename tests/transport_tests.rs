use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};

use wearlog::codec;
use wearlog::core::{Record, SamplingRate, SessionMetadata, StartCommand};
use wearlog::engine::{CaptureScheduler, SessionEvent, TransferOutcome};
use wearlog::hal::mock::{CountingWakeLock, SimulatedSensorSource};
use wearlog::transport::{
    Channel, DataItem, DataListener, LoopbackChannel, TransferClient, DATA_PATH, SENSOR_CODES,
    SENSOR_LIST, WATCH_SENSORS_PATH,
};
use wearlog::TransportError;

fn payload() -> codec::TransferPayload {
    codec::encode(&[Record::new(1, 1.0, 2.0, 3.0)], &[], HashMap::new())
}

/// Channel with fixed connect and put behaviour that counts every call
struct ScriptedChannel {
    hang_on_connect: bool,
    put_error: Option<TransportError>,
    connects: AtomicUsize,
    puts: AtomicUsize,
    disconnects: AtomicUsize,
}

impl ScriptedChannel {
    fn new(hang_on_connect: bool, put_error: Option<TransportError>) -> Self {
        Self {
            hang_on_connect,
            put_error,
            connects: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.hang_on_connect {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn put(&self, _item: DataItem) -> Result<(), TransportError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        match &self.put_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn subscribe(&self, _path: &str, _listener: Arc<dyn DataListener>) {}
}

#[tokio::test]
async fn test_send_opens_and_closes_connection() {
    let channel = Arc::new(LoopbackChannel::new());
    let client = TransferClient::new(channel.clone());

    assert_ok!(client.send_payload(payload()).await);

    assert_eq!(channel.connect_attempts(), 1);
    assert_eq!(channel.disconnect_count(), 1);
    assert_eq!(channel.open_connections(), 0);
    assert_eq!(channel.items()[0].path, DATA_PATH);
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout_drops_payload() {
    let channel = Arc::new(LoopbackChannel::new());
    channel.set_connect_delay(Duration::from_secs(120));
    let client = TransferClient::new(channel.clone());
    let started = Instant::now();

    let err = assert_err!(client.send_payload(payload()).await);

    assert_eq!(err, TransportError::ConnectTimeout(Duration::from_secs(30)));
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(channel.items().is_empty());
    assert_eq!(channel.open_connections(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_custom_connect_timeout() {
    let channel = Arc::new(LoopbackChannel::new());
    channel.set_connect_delay(Duration::from_secs(3));

    let short = TransferClient::new(channel.clone()).with_connect_timeout(Duration::from_secs(1));
    assert_eq!(
        short.send_payload(payload()).await,
        Err(TransportError::ConnectTimeout(Duration::from_secs(1)))
    );

    let long = TransferClient::new(channel.clone()).with_connect_timeout(Duration::from_secs(5));
    assert_ok!(long.send_payload(payload()).await);
}

#[tokio::test]
async fn test_unreachable_companion() {
    let channel = Arc::new(LoopbackChannel::new());
    channel.set_reachable(false);
    let client = TransferClient::new(channel.clone());

    assert_eq!(client.send_payload(payload()).await, Err(TransportError::Unreachable));
    assert!(channel.items().is_empty());
}

#[tokio::test]
async fn test_put_requires_connection() {
    let channel = LoopbackChannel::new();
    let item = wearlog::transport::DataItem::new(DATA_PATH, payload().into_data_map());
    assert!(matches!(
        channel.put(item).await,
        Err(TransportError::Rejected { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_failed_transfer_is_reported_and_not_retried() {
    let sensors = Arc::new(SimulatedSensorSource::new());
    let channel = Arc::new(LoopbackChannel::new());
    channel.set_reachable(false);
    let scheduler = CaptureScheduler::new(
        sensors.clone(),
        Arc::new(CountingWakeLock::new()),
        TransferClient::new(channel.clone()),
    );

    let mut handle = scheduler
        .start(SessionMetadata::new(StartCommand::timed(1, SamplingRate::Normal)))
        .unwrap();
    let mut events = handle.subscribe_events();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.outcome, TransferOutcome::Failed(TransportError::Unreachable));
    assert_eq!(channel.connect_attempts(), 1);

    let mut failures = 0;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::TransferFailed(TransportError::Unreachable) = event {
            failures += 1;
        }
    }
    assert_eq!(failures, 1);

    // Nothing queued for later
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(channel.connect_attempts(), 1);
}

#[tokio::test]
async fn test_advertise_sensors() {
    let channel = Arc::new(LoopbackChannel::new());
    let scheduler = CaptureScheduler::new(
        Arc::new(SimulatedSensorSource::new()),
        Arc::new(CountingWakeLock::new()),
        TransferClient::new(channel.clone()),
    );

    assert_ok!(scheduler.advertise_sensors().await);

    let items = channel.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].path, WATCH_SENSORS_PATH);
    assert_eq!(
        items[0].data.string_list(SENSOR_LIST).unwrap(),
        ["accelerometer".to_string(), "gyroscope".to_string()]
    );
    assert_eq!(items[0].data.int_list(SENSOR_CODES).unwrap(), [1, 4]);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_put_still_disconnects() {
    let rejected = TransportError::Rejected {
        path: DATA_PATH.to_string(),
        reason: "quota exceeded".to_string(),
    };
    let channel = Arc::new(ScriptedChannel::new(false, Some(rejected.clone())));
    let client = TransferClient::new(channel.clone());

    let err = assert_err!(client.send_payload(payload()).await);
    assert_eq!(err, rejected);
    assert_eq!(channel.connects.load(Ordering::SeqCst), 1);
    assert_eq!(channel.puts.load(Ordering::SeqCst), 1);
    assert_eq!(channel.disconnects.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(channel.connects.load(Ordering::SeqCst), 1);
    assert_eq!(channel.puts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout_still_disconnects() {
    let channel = Arc::new(ScriptedChannel::new(true, None));
    let client = TransferClient::new(channel.clone()).with_connect_timeout(Duration::from_secs(2));

    let err = assert_err!(client.send_payload(payload()).await);
    assert_eq!(err, TransportError::ConnectTimeout(Duration::from_secs(2)));
    assert_eq!(channel.puts.load(Ordering::SeqCst), 0);
    assert_eq!(channel.disconnects.load(Ordering::SeqCst), 1);
}
