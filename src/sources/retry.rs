use crate::sources::{RawPage, SourceError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt `attempt` (0-based): base × 2^attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Result of fetching one partition page. Failures are data, not errors: the
/// scheduler counts them and moves on.
#[derive(Debug)]
pub enum PageFetch {
    Fetched(RawPage),
    Failed { attempts: u32, error: SourceError },
}

pub fn fetch_with_retry<F>(policy: RetryPolicy, label: &str, mut attempt_fn: F) -> PageFetch
where
    F: FnMut() -> Result<RawPage, SourceError>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        match attempt_fn() {
            Ok(page) => return PageFetch::Fetched(page),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    page = label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "⚠️ fetch failed, retrying"
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(page = label, attempts = attempt + 1, error = %e, "❌ giving up on page");
                return PageFetch::Failed {
                    attempts: attempt + 1,
                    error: e,
                };
            }
        }
    }
}
