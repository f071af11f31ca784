pub mod channel;
pub mod client;
pub mod data_map;
pub mod loopback;

pub use channel::{Channel, DataListener, DATA_PATH, SENSOR_CODES, SENSOR_LIST, WATCH_SENSORS_PATH};
pub use client::{TransferClient, DEFAULT_CONNECT_TIMEOUT};
pub use data_map::{DataEvent, DataItem, DataMap, EventKind};
pub use loopback::LoopbackChannel;
