pub mod scheduler;
pub mod state;

pub use scheduler::{
    CaptureScheduler, SessionEvent, SessionHandle, SessionReport, StopReason, TransferOutcome,
    DEFAULT_SETTLE_DELAY,
};
pub use state::CaptureState;
