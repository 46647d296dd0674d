//! The narrow contract the ingestion and verification paths use to reach the
//! persisted `properties` table.

use crate::domain::{PropertyRecord, Source, VerificationOutcome};
use crate::errors::StoreError;
use chrono::NaiveDateTime;
use std::collections::HashSet;

/// Which unverified properties a verification run pulls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionQuery {
    pub batch_size: usize,
    pub source: Option<Source>,
    /// Retry properties that previously failed with `API_ERROR`. Soft failures
    /// stay eligible either way; the flag is carried for run journaling and logs.
    pub include_soft_failed: bool,
    /// Only return properties that previously failed with `API_ERROR`.
    pub api_error_only: bool,
    /// Keyset position of the last row handed out in this run.
    pub after: Option<SelectionCursor>,
}

/// Position in the `(date_added, id)` ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCursor {
    pub date_added: NaiveDateTime,
    pub row_id: i64,
}

/// A property handed to the verification worker, with its keyset position.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedProperty {
    pub record: PropertyRecord,
    pub cursor: SelectionCursor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusUpdateReport {
    pub updated: usize,
    pub not_found: usize,
}

pub trait PropertyStore {
    /// Returns the subset of `ids` already present in the store. Callers keep
    /// `ids` under the statement size limit.
    fn exists_batch(&self, ids: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Inserts `records` in one transaction, silently ignoring rows whose
    /// `property_id` already exists. Returns how many rows were written.
    fn insert_batch(&self, records: &[PropertyRecord]) -> Result<usize, StoreError>;

    /// Writes verification outcomes in one pass: verified ids in one grouped
    /// update, failed ids in one update per distinct reason.
    fn update_status_batch(
        &self,
        outcomes: &[VerificationOutcome],
    ) -> Result<StatusUpdateReport, StoreError>;

    /// Eligible properties ordered by `date_added` ascending (oldest first).
    fn select_unverified(&self, query: &SelectionQuery)
        -> Result<Vec<SelectedProperty>, StoreError>;
}
