use crate::domain::FailureReason;

/// Consecutive `API_ERROR` counter. Any other outcome resets it; the breaker
/// trips the first time the count reaches `threshold` and stays tripped.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    consecutive_errors: u32,
    threshold: u32,
    tripped: bool,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_errors: 0,
            threshold: threshold.max(1),
            tripped: false,
        }
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    /// Feeds one verification outcome. Returns true on the outcome that trips.
    pub fn record(&mut self, failure: Option<FailureReason>) -> bool {
        if failure == Some(FailureReason::ApiError) {
            self.consecutive_errors += 1;
            if !self.tripped && self.consecutive_errors >= self.threshold {
                self.tripped = true;
                return true;
            }
        } else {
            self.consecutive_errors = 0;
        }
        false
    }
}
