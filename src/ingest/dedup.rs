use crate::domain::PropertyRecord;
use std::collections::HashSet;

/// In-process half of deduplication: ids already handled during this run.
/// The store-side half is the writer's existence check.
#[derive(Debug, Default)]
pub struct DedupGate {
    seen: HashSet<String>,
}

/// What the gate did with one page of records.
#[derive(Debug, Default)]
pub struct GateResult {
    pub fresh: Vec<PropertyRecord>,
    /// Ids already handled earlier in this run (or twice on the same page).
    pub already_seen: usize,
    /// Records dropped for an empty id.
    pub invalid: usize,
}

impl DedupGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn admit(&mut self, records: Vec<PropertyRecord>) -> GateResult {
        let mut result = GateResult::default();

        for record in records {
            if record.property_id.trim().is_empty() {
                result.invalid += 1;
                continue;
            }
            if self.seen.insert(record.property_id.clone()) {
                result.fresh.push(record);
            } else {
                result.already_seen += 1;
            }
        }

        result
    }
}

/// Running existing-count for one partition.
#[derive(Debug, Clone)]
pub struct PartitionTally {
    existing: usize,
    threshold: usize,
}

impl PartitionTally {
    pub fn new(threshold: usize) -> Self {
        Self {
            existing: 0,
            threshold,
        }
    }

    pub fn existing(&self) -> usize {
        self.existing
    }

    /// Adds `n` known listings. Returns true only on the call that first
    /// reaches the threshold.
    pub fn record_existing(&mut self, n: usize) -> bool {
        let was_stopped = self.should_stop();
        self.existing += n;
        !was_stopped && self.should_stop()
    }

    pub fn should_stop(&self) -> bool {
        self.threshold > 0 && self.existing >= self.threshold
    }
}
