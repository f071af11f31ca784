use serde::{Deserialize, Serialize};
use std::fmt;

/// One timestamped 3-axis sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Sensor clock timestamp in nanoseconds
    pub timestamp: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Record {
    pub fn new(timestamp: i64, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp, x, y, z }
    }
}

/// Persisted line format: `timestamp x y z`
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.timestamp, self.x, self.y, self.z)
    }
}

/// Sensor channels sampled on the wearable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorChannel {
    Accelerometer,
    Gyroscope,
}

impl SensorChannel {
    pub const ALL: [SensorChannel; 2] = [SensorChannel::Accelerometer, SensorChannel::Gyroscope];

    /// Sensor name used in log file names
    pub fn file_label(&self) -> &'static str {
        match self {
            Self::Accelerometer => "watch_accel",
            Self::Gyroscope => "watch_gyro",
        }
    }

    /// Platform sensor type code
    pub fn type_code(&self) -> i32 {
        match self {
            Self::Accelerometer => 1,
            Self::Gyroscope => 4,
        }
    }
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accelerometer => write!(f, "accelerometer"),
            Self::Gyroscope => write!(f, "gyroscope"),
        }
    }
}
