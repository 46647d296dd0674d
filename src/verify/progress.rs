use crate::domain::VerificationCounts;
use serde::Serialize;

/// Snapshot handed to the reporter after every processed batch and once at
/// the end of the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationProgress {
    #[serde(flatten)]
    pub counts: VerificationCounts,
    pub batches: u64,
    pub running: bool,
    pub halted: bool,
    pub message: Option<String>,
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &VerificationProgress);
}

impl<F> ProgressReporter for F
where
    F: Fn(&VerificationProgress) + Send + Sync,
{
    fn report(&self, progress: &VerificationProgress) {
        self(progress)
    }
}
