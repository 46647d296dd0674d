//! Verification of stored listings against the address-check service.

mod breaker;
mod client;
mod progress;
mod updater;
mod worker;

pub use breaker::CircuitBreaker;
pub use client::{interpret_response, AddressCheckClient, CheckError, CheckResponse, VerificationService, VERIFY_TIMEOUT};
pub use progress::{ProgressReporter, VerificationProgress};
pub use updater::StatusUpdater;
pub use worker::{RunOutcome, VerificationReport, VerificationWorker, VerifyOptions, MIN_SQUARE_FOOTAGE};
