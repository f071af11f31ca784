use anyhow::Result;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use wearlog::core::{SamplingRate, SessionMetadata, StartCommand};
use wearlog::engine::SessionEvent;
use wearlog::hal::mock::{CountingWakeLock, SimulatedSensorSource};
use wearlog::logger::init_logger;
use wearlog::receiver::EventReport;
use wearlog::transport::{Channel, LoopbackChannel, DATA_PATH, WATCH_SENSORS_PATH};
use wearlog::WearlogConfig;

/// Simulated wearable and companion joined by an in-memory link.
///
/// Usage: `wearlog [config.json] [capture-seconds]`
#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => WearlogConfig::load_from_file(path)?,
        None => WearlogConfig::default(),
    };
    let capture_secs: u64 = args.next().map(|s| s.parse::<u64>()).transpose()?.unwrap_or(3);

    // Companion
    let channel = Arc::new(LoopbackChannel::new());
    let listener = Arc::new(config.listener());
    channel.subscribe(DATA_PATH, listener.clone());
    channel.subscribe(WATCH_SENSORS_PATH, listener.clone());

    // Wearable
    let sensors = Arc::new(SimulatedSensorSource::new().periodic(Duration::from_millis(20)));
    let wake_lock = Arc::new(CountingWakeLock::new());
    let scheduler = config.scheduler(sensors, wake_lock.clone(), channel.clone());

    scheduler.advertise_sensors().await?;

    let metadata = SessionMetadata::new(StartCommand::manual(SamplingRate::Game))
        .with_labels("demo", "walking");
    let mut session = scheduler.start(metadata)?;
    let mut events = session.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let SessionEvent::StateChanged(state) = event {
                info!("Session state: {}", state);
            }
        }
    });

    tokio::time::sleep(config.settle_delay() + Duration::from_secs(capture_secs)).await;
    session.stop();
    let report = session.wait().await?;
    info!(
        "Session finished: {} accelerometer / {} gyroscope records, transfer {:?}",
        report.accel_records, report.gyro_records, report.outcome
    );

    for report in listener.take_reports() {
        if let EventReport::Session { channels, .. } = report {
            for (channel, outcome) in channels {
                info!("{}: {:?}", channel, outcome);
            }
        }
    }
    info!("Receiver metrics: {:?}", listener.metrics().snapshot());
    info!("Wake lock acquired {} / released {}", wake_lock.acquire_count(), wake_lock.release_count());

    Ok(())
}
