pub mod sensor;
pub mod wake;

pub use sensor::{SensorCall, SimulatedSensorSource};
pub use wake::CountingWakeLock;
