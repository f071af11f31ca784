use serde::{Deserialize, Serialize};
use std::fmt;

/// Capture session states on the wearable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    Idle,
    WakeAcquired,
    /// Settling delay before sensors are activated
    Delayed,
    Sampling,
    TimedStop,
    ManualStop,
    Flushing,
}

impl CaptureState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: &CaptureState) -> bool {
        use CaptureState::*;

        matches!(
            (self, target),
            (Idle, WakeAcquired) |
            (WakeAcquired, Delayed) |

            (Delayed, Sampling) |
            // Stop issued before sensors were activated
            (Delayed, ManualStop) |

            (Sampling, TimedStop) |
            (Sampling, ManualStop) |

            (TimedStop, Flushing) |
            (ManualStop, Flushing) |

            (Flushing, Idle)
        )
    }

    /// Sensor subscriptions may only be active in this state
    pub fn is_sampling(&self) -> bool {
        matches!(self, Self::Sampling)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::WakeAcquired => "WakeAcquired",
            Self::Delayed => "Delayed",
            Self::Sampling => "Sampling",
            Self::TimedStop => "TimedStop",
            Self::ManualStop => "ManualStop",
            Self::Flushing => "Flushing",
        }
    }
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CaptureState::*;

    #[test]
    fn test_happy_paths() {
        let timed = [Idle, WakeAcquired, Delayed, Sampling, TimedStop, Flushing, Idle];
        let manual = [Idle, WakeAcquired, Delayed, Sampling, ManualStop, Flushing, Idle];

        for path in [timed, manual] {
            for pair in path.windows(2) {
                assert!(pair[0].can_transition_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_early_stop() {
        assert!(Delayed.can_transition_to(&ManualStop));
        assert!(!Delayed.can_transition_to(&TimedStop));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!Idle.can_transition_to(&Sampling));
        assert!(!Sampling.can_transition_to(&Idle));
        assert!(!Flushing.can_transition_to(&Sampling));
        assert!(!TimedStop.can_transition_to(&Sampling));
    }

    #[test]
    fn test_only_sampling_state_samples() {
        let all = [Idle, WakeAcquired, Delayed, Sampling, TimedStop, ManualStop, Flushing];
        let sampling: Vec<_> = all.iter().filter(|state| state.is_sampling()).collect();
        assert_eq!(sampling, vec![&Sampling]);
    }
}
