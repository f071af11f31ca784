pub mod buffer;
pub mod record;
pub mod session;

pub use buffer::{FrozenBuffer, SampleBuffer, SampleSink};
pub use record::{Record, SensorChannel};
pub use session::{SamplingRate, SessionMetadata, StartCommand};
