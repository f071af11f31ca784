pub mod listener;

pub use listener::{ChannelOutcome, EventReport, ListenerService};
