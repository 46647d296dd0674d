use crate::db::{PropertyStore, StatusUpdateReport};
use crate::domain::VerificationOutcome;

/// Buffers outcomes and writes them back `batch_size` at a time.
pub struct StatusUpdater<'a, S: ?Sized> {
    store: &'a S,
    batch_size: usize,
    pending: Vec<VerificationOutcome>,
    totals: StatusUpdateReport,
    failed_writes: usize,
}

impl<'a, S: PropertyStore + ?Sized> StatusUpdater<'a, S> {
    pub fn new(store: &'a S, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            totals: StatusUpdateReport::default(),
            failed_writes: 0,
        }
    }

    pub fn push(&mut self, outcome: VerificationOutcome) {
        self.pending.push(outcome);
        if self.pending.len() >= self.batch_size {
            self.flush();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Writes everything buffered. A failed write is logged and counted; the
    /// outcomes are dropped and those properties stay eligible for a later run.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.pending);
        match self.store.update_status_batch(&batch) {
            Ok(report) => {
                tracing::debug!(updated = report.updated, not_found = report.not_found, "💾 status batch written");
                self.totals.updated += report.updated;
                self.totals.not_found += report.not_found;
            }
            Err(e) => {
                tracing::error!(outcomes = batch.len(), error = %e, "❌ status batch write failed");
                self.failed_writes += batch.len();
            }
        }
    }

    pub fn totals(&self) -> StatusUpdateReport {
        self.totals
    }

    pub fn failed_writes(&self) -> usize {
        self.failed_writes
    }
}
