pub mod partition;
pub mod property;
pub mod verification;

pub use partition::{Category, FetchPartition};
pub use property::{format_address, FailureReason, PropertyRecord, PropertyType, Source};
pub use verification::{VerificationCounts, VerificationOutcome};
