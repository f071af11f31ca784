use log::{debug, info, warn};
use std::sync::Arc;
use tokio::time::{timeout, Duration};

use super::channel::{DATA_PATH, SENSOR_CODES, SENSOR_LIST, WATCH_SENSORS_PATH};
use super::{Channel, DataItem, DataMap};
use crate::codec::TransferPayload;
use crate::error::TransportError;
use crate::hal::SensorDescriptor;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sending side of the link.
///
/// Every send opens a connection under a bounded wait and closes it
/// afterwards. Failed sends are dropped: there is no queue and no retry.
#[derive(Clone)]
pub struct TransferClient {
    channel: Arc<dyn Channel>,
    connect_timeout: Duration,
}

impl TransferClient {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self {
            channel,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub async fn send(&self, path: &str, data: DataMap) -> Result<(), TransportError> {
        match timeout(self.connect_timeout, self.channel.connect()).await {
            Err(_) => {
                warn!("Connection to transport timed out after {:?}", self.connect_timeout);
                // The abandoned connect may still complete on the service side.
                self.channel.disconnect().await;
                return Err(TransportError::ConnectTimeout(self.connect_timeout));
            }
            Ok(Err(e)) => {
                warn!("Failed to connect to transport: {}", e);
                return Err(e);
            }
            Ok(Ok(())) => {}
        }

        let bytes = data.asset_len();
        let result = self.channel.put(DataItem::new(path, data)).await;
        self.channel.disconnect().await;

        match &result {
            Ok(()) => debug!("Put {} asset bytes to {}", bytes, path),
            Err(e) => warn!("Put to {} failed: {}", path, e),
        }
        result
    }

    /// Send a session payload on the data path
    pub async fn send_payload(&self, payload: TransferPayload) -> Result<(), TransportError> {
        info!("Sending data from watch to phone");
        self.send(DATA_PATH, payload.into_data_map()).await
    }

    /// Advertise the wearable's sensors to the companion
    pub async fn advertise_sensors(&self, sensors: &[SensorDescriptor]) -> Result<(), TransportError> {
        let mut data = DataMap::new();
        data.put_string_list(SENSOR_LIST, sensors.iter().map(|s| s.name.clone()).collect());
        data.put_int_list(SENSOR_CODES, sensors.iter().map(|s| s.code).collect());
        self.send(WATCH_SENSORS_PATH, data).await
    }
}
