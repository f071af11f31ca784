use async_trait::async_trait;
use std::sync::Arc;

use super::{DataEvent, DataItem};
use crate::error::TransportError;

/// Path carrying session sample payloads
pub const DATA_PATH: &str = "/data";
/// Path carrying the wearable's sensor list
pub const WATCH_SENSORS_PATH: &str = "/watch_sensors";

pub const SENSOR_LIST: &str = "SENSOR_LIST";
pub const SENSOR_CODES: &str = "SENSOR_CODES";

/// Receiver of change notifications for a subscribed path
#[async_trait]
pub trait DataListener: Send + Sync {
    /// Called once per inbound batch. Events must be handled independently.
    async fn on_data_changed(&self, events: &[DataEvent]);
}

/// Asynchronous, possibly failing link between the wearable and the companion
#[async_trait]
pub trait Channel: Send + Sync {
    /// Establish a connection to the transport service
    async fn connect(&self) -> Result<(), TransportError>;

    /// Publish a data item to the peer
    async fn put(&self, item: DataItem) -> Result<(), TransportError>;

    async fn disconnect(&self);

    /// Register `listener` for change notifications on `path`
    fn subscribe(&self, path: &str, listener: Arc<dyn DataListener>);
}
