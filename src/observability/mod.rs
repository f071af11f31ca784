pub mod metrics;

pub use metrics::{ReceiverMetrics, ReceiverSnapshot};
