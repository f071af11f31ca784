pub mod codec;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod hal;
pub mod logger;
pub mod observability;
pub mod persistence;
pub mod receiver;
pub mod transport;

pub use config::WearlogConfig;
pub use error::{CaptureError, DecodeError, PersistError, TransportError};
