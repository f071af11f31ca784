pub mod mock;
pub mod traits;
pub mod wake;

pub use traits::{SensorDescriptor, SensorSource, WakeLock};
pub use wake::WakeGuard;
