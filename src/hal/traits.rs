use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{SampleSink, SamplingRate, SensorChannel};
use crate::error::CaptureError;

/// Sensor advertised by the wearable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    pub name: String,
    pub code: i32,
}

/// Platform sensor capability
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Whether the device has a default sensor for this channel
    fn has_capability(&self, channel: SensorChannel) -> bool;

    /// Start pushing samples for `channel` into `sink` at the given rate
    async fn subscribe(
        &self,
        channel: SensorChannel,
        rate: SamplingRate,
        sink: SampleSink,
    ) -> Result<(), CaptureError>;

    /// Stop delivery for `channel`. No sample reaches the sink after this returns.
    async fn unsubscribe(&self, channel: SensorChannel);

    /// Every sensor present on the device
    fn describe_sensors(&self) -> Vec<SensorDescriptor> {
        SensorChannel::ALL
            .iter()
            .filter(|c| self.has_capability(**c))
            .map(|c| SensorDescriptor {
                name: c.to_string(),
                code: c.type_code(),
            })
            .collect()
    }
}

/// Platform wake-lock capability keeping the device awake while sampling
pub trait WakeLock: Send + Sync {
    fn acquire(&self);

    fn release(&self);

    fn is_held(&self) -> bool;
}
