use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::SensorChannel;

/// Errors raised on the wearable side while running a capture session
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("a capture session is already active")]
    SessionActive,

    #[error("sensor capability unavailable: {0}")]
    CapabilityUnavailable(SensorChannel),

    #[error("unknown sampling rate code: {0}")]
    UnknownSamplingRate(i32),

    #[error("sensor subscription failed for {channel}: {reason}")]
    Subscription {
        channel: SensorChannel,
        reason: String,
    },
}

/// Errors raised by the device-to-device link
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection to transport service timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("companion device unreachable")]
    Unreachable,

    #[error("transport rejected data item at {path}: {reason}")]
    Rejected { path: String, reason: String },
}

/// Errors raised while decoding a record asset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("asset {0} missing from payload")]
    MissingAsset(String),

    #[error("asset is empty")]
    Empty,

    #[error("bad magic bytes {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("asset truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("{0} unexpected trailing bytes after last record")]
    TrailingBytes(usize),
}

/// Errors raised while writing log files on the companion side
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
