//! Request pacing. Delays are policy, so they sit behind a trait that tests swap
//! for `NoDelay`.

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub trait Pacer: Send + Sync {
    /// Called immediately before every external request.
    fn before_call(&self);
}

/// Never sleeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn before_call(&self) {}
}

/// Sleeps a random duration in `[min, max]` before each call and, every
/// `pause_every` calls, an extra fixed pause.
#[derive(Debug)]
pub struct JitteredPacer {
    min: Duration,
    max: Duration,
    pause_every: Option<u64>,
    pause: Duration,
    calls: AtomicU64,
}

impl JitteredPacer {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
            pause_every: None,
            pause: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_pause_every(mut self, calls: u64, pause: Duration) -> Self {
        self.pause_every = (calls > 0).then_some(calls);
        self.pause = pause;
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// The delay for call number `call` (1-based), without sleeping.
    fn delay_for(&self, call: u64) -> Duration {
        let jitter = if self.max > self.min {
            rand::thread_rng().gen_range(self.min..=self.max)
        } else {
            self.min
        };

        match self.pause_every {
            Some(every) if call % every == 0 => {
                tracing::info!(calls = call, pause_secs = self.pause.as_secs_f64(), "⏸️ courtesy pause");
                jitter + self.pause
            }
            _ => jitter,
        }
    }
}

impl Pacer for JitteredPacer {
    fn before_call(&self) {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        let delay = self.delay_for(call);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
