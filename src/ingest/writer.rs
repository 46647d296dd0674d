use crate::db::PropertyStore;
use crate::domain::PropertyRecord;
use std::collections::HashSet;

/// Counts from one `UpsertWriter::upsert` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub inserted: usize,
    /// Already in the store, or lost an insert race to another writer.
    pub skipped: usize,
    /// Empty ids.
    pub invalid: usize,
    /// Rows in sub-batches whose insert failed after retries.
    pub failed: usize,
}

impl UpsertReport {
    pub fn absorb(&mut self, other: UpsertReport) {
        self.inserted += other.inserted;
        self.skipped += other.skipped;
        self.invalid += other.invalid;
        self.failed += other.failed;
    }
}

/// Turns transformed records into persisted rows without ever inserting a
/// `property_id` twice.
pub struct UpsertWriter<S> {
    store: S,
    exists_chunk: usize,
    batch_size: usize,
}

impl<S: PropertyStore> UpsertWriter<S> {
    pub fn new(store: S, exists_chunk: usize, batch_size: usize) -> Self {
        Self {
            store,
            exists_chunk: exists_chunk.max(1),
            batch_size: batch_size.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Never fails: store errors are logged and counted, and the caller moves on.
    pub fn upsert(&self, records: &[PropertyRecord]) -> UpsertReport {
        let mut report = UpsertReport::default();

        let mut unique_ids: HashSet<&str> = HashSet::with_capacity(records.len());
        let mut candidates: Vec<&PropertyRecord> = Vec::with_capacity(records.len());
        for record in records {
            if record.property_id.trim().is_empty() {
                report.invalid += 1;
            } else if unique_ids.insert(record.property_id.as_str()) {
                candidates.push(record);
            } else {
                report.skipped += 1;
            }
        }

        if candidates.is_empty() {
            return report;
        }

        let existing = self.existing_ids(&candidates);
        let to_insert: Vec<PropertyRecord> = candidates
            .into_iter()
            .filter(|r| !existing.contains(&r.property_id))
            .cloned()
            .collect();
        report.skipped += existing.len();

        // Each sub-batch commits on its own; a failure here keeps earlier ones.
        for chunk in to_insert.chunks(self.batch_size) {
            match self.store.insert_batch(chunk) {
                Ok(inserted) => {
                    report.inserted += inserted;
                    report.skipped += chunk.len().saturating_sub(inserted);
                }
                Err(e) => {
                    tracing::error!(rows = chunk.len(), error = %e, "❌ insert sub-batch failed");
                    report.failed += chunk.len();
                }
            }
        }

        tracing::debug!(
            inserted = report.inserted,
            skipped = report.skipped,
            invalid = report.invalid,
            failed = report.failed,
            "upsert batch written"
        );
        report
    }

    /// Ids already stored. A chunk whose lookup fails counts as "none known";
    /// the idempotent insert still keeps those rows single.
    fn existing_ids(&self, candidates: &[&PropertyRecord]) -> HashSet<String> {
        let mut existing = HashSet::new();

        for chunk in candidates.chunks(self.exists_chunk) {
            let ids: Vec<String> = chunk.iter().map(|r| r.property_id.clone()).collect();
            match self.store.exists_batch(&ids) {
                Ok(found) => existing.extend(found),
                Err(e) => {
                    tracing::warn!(ids = ids.len(), error = %e, "existence check failed, relying on insert conflict handling");
                }
            }
        }

        existing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, Database, SqliteStore};
    use crate::domain::Source;

    fn make_writer(exists_chunk: usize, batch_size: usize) -> (tempfile::TempDir, UpsertWriter<SqliteStore>) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("w.sqlite").to_string_lossy().to_string());
        init_db(&db, "sql/schema.sql").unwrap();
        (dir, UpsertWriter::new(SqliteStore::new(db), exists_chunk, batch_size))
    }

    fn records(range: std::ops::Range<usize>) -> Vec<PropertyRecord> {
        range
            .map(|i| PropertyRecord::new(format!("p{i}"), Source::Realtor))
            .collect()
    }

    #[test]
    fn mostly_known_batch_inserts_only_the_new_part() {
        let (_dir, writer) = make_writer(1000, 1000);
        let seeded = writer.upsert(&records(0..1000));
        assert_eq!(seeded.inserted, 1000);

        let report = writer.upsert(&records(0..1500));
        assert!(report.inserted <= 500);
        assert!(report.skipped >= 1000);
        assert_eq!(report.inserted + report.skipped, 1500);
    }

    #[test]
    fn repeated_upserts_insert_each_key_once() {
        let (_dir, writer) = make_writer(7, 3);
        let mut batch = records(0..20);
        batch.extend(records(5..10));

        let first = writer.upsert(&batch);
        let second = writer.upsert(&batch);

        assert_eq!(first.inserted, 20);
        assert_eq!(first.skipped, 5);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 25);
    }

    #[test]
    fn empty_ids_are_counted_not_written() {
        let (_dir, writer) = make_writer(1000, 1000);
        let mut batch = records(0..2);
        batch.push(PropertyRecord::new("  ", Source::Realtor));

        let report = writer.upsert(&batch);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.invalid, 1);
    }
}
