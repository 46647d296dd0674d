//! Source pages → dedup → persisted rows.

mod dedup;
mod run;
mod scheduler;
mod writer;

#[cfg(test)]
mod testing;

pub use dedup::{DedupGate, GateResult, PartitionTally};
pub use run::{IngestProgress, IngestReporter, IngestSettings, IngestSummary, Ingestor};
pub use scheduler::{FetchScheduler, PartitionReport};
pub use writer::{UpsertReport, UpsertWriter};
