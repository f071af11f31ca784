use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Platform sensor delay codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingRate {
    Fastest,
    Game,
    Ui,
    Normal,
}

impl SamplingRate {
    pub fn from_code(code: i32) -> Result<Self, CaptureError> {
        match code {
            0 => Ok(Self::Fastest),
            1 => Ok(Self::Game),
            2 => Ok(Self::Ui),
            3 => Ok(Self::Normal),
            other => Err(CaptureError::UnknownSamplingRate(other)),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Fastest => 0,
            Self::Game => 1,
            Self::Ui => 2,
            Self::Normal => 3,
        }
    }
}

impl Default for SamplingRate {
    fn default() -> Self {
        SamplingRate::Normal
    }
}

/// Session-start command issued by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartCommand {
    pub duration_minutes: u32,
    pub sampling_rate: SamplingRate,
    pub timed_mode: bool,
}

impl StartCommand {
    pub fn timed(duration_minutes: u32, sampling_rate: SamplingRate) -> Self {
        Self {
            duration_minutes,
            sampling_rate,
            timed_mode: true,
        }
    }

    pub fn manual(sampling_rate: SamplingRate) -> Self {
        Self {
            duration_minutes: 0,
            sampling_rate,
            timed_mode: false,
        }
    }
}

/// Immutable description of one capture session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub username: Option<String>,
    pub activity_name: Option<String>,
    pub sampling_rate: SamplingRate,
    pub duration_minutes: u32,
    pub timed_mode: bool,
}

impl SessionMetadata {
    pub fn new(command: StartCommand) -> Self {
        Self {
            username: None,
            activity_name: None,
            sampling_rate: command.sampling_rate,
            duration_minutes: command.duration_minutes,
            timed_mode: command.timed_mode,
        }
    }

    pub fn with_labels(mut self, username: impl Into<String>, activity_name: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.activity_name = Some(activity_name.into());
        self
    }
}
