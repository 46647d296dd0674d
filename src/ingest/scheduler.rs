//! Paginated fetch for one partition: page 1 alone, then the remaining pages in
//! waves across a bounded set of worker threads.

use crate::db::PropertyStore;
use crate::domain::FetchPartition;
use crate::ingest::dedup::{DedupGate, PartitionTally};
use crate::ingest::writer::{UpsertReport, UpsertWriter};
use crate::pacing::Pacer;
use crate::sources::{PageFetch, RawPage, SourceAdapter};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PartitionReport {
    pub partition: String,
    pub total_known: Option<usize>,
    pub pages_planned: u32,
    pub pages_fetched: u32,
    pub pages_failed: u32,
    /// Pages dropped after the early-stop signal or a cancel, before any request.
    pub pages_skipped: u32,
    pub malformed: usize,
    pub already_seen: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub insert_failed: usize,
    pub stopped_early: bool,
    pub cancelled: bool,
}

impl PartitionReport {
    fn new(partition: &FetchPartition) -> Self {
        Self {
            partition: partition.to_string(),
            ..Default::default()
        }
    }

    fn absorb_upsert(&mut self, upsert: UpsertReport) {
        self.inserted += upsert.inserted;
        self.skipped += upsert.skipped;
        self.malformed += upsert.invalid;
        self.insert_failed += upsert.failed;
    }
}

enum PageOutcome {
    Fetched(RawPage),
    Failed,
    Skipped,
}

pub struct FetchScheduler<'a, S> {
    adapter: &'a dyn SourceAdapter,
    writer: &'a UpsertWriter<S>,
    pacer: &'a dyn Pacer,
    early_stop_threshold: usize,
}

impl<'a, S: PropertyStore> FetchScheduler<'a, S> {
    pub fn new(
        adapter: &'a dyn SourceAdapter,
        writer: &'a UpsertWriter<S>,
        pacer: &'a dyn Pacer,
        early_stop_threshold: usize,
    ) -> Self {
        Self {
            adapter,
            writer,
            pacer,
            early_stop_threshold,
        }
    }

    /// Fetches, filters and persists one partition. Results are consumed on the
    /// calling thread as they arrive; the existing-count is checked after page 1
    /// and after every later page.
    pub fn run_partition(
        &self,
        partition: &FetchPartition,
        gate: &mut DedupGate,
        cancel: &CancellationToken,
    ) -> PartitionReport {
        let mut report = PartitionReport::new(partition);
        let mut tally = PartitionTally::new(self.early_stop_threshold);

        if cancel.is_cancelled() {
            report.cancelled = true;
            return report;
        }

        self.pacer.before_call();
        let first = match self.adapter.fetch_page(partition, 1) {
            PageFetch::Fetched(page) => page,
            PageFetch::Failed { attempts, error } => {
                tracing::warn!(partition = %partition, attempts, error = %error, "⚠️ first page failed, skipping partition");
                report.pages_planned = 1;
                report.pages_failed = 1;
                return report;
            }
        };

        let settings = self.adapter.settings();
        let total_pages = settings.total_pages(first.total_known, first.items.len());
        report.total_known = first.total_known;
        report.pages_planned = total_pages;

        tracing::info!(
            partition = %partition,
            total = ?first.total_known,
            pages = total_pages,
            "📊 partition sized"
        );

        if self.absorb_page(partition, first, gate, &mut tally, &mut report) {
            report.stopped_early = true;
            report.pages_skipped = total_pages.saturating_sub(1);
            return report;
        }

        let remaining: Vec<u32> = (2..=total_pages).collect();
        let stop = cancel.child_token();

        for wave in remaining.chunks(settings.wave_size.max(1)) {
            if stop.is_cancelled() {
                report.pages_skipped += wave.len() as u32;
                continue;
            }
            self.run_wave(partition, wave, settings.workers, gate, &mut tally, &stop, &mut report);
        }

        report.cancelled = cancel.is_cancelled();
        tracing::info!(
            partition = %partition,
            fetched = report.pages_fetched,
            failed = report.pages_failed,
            skipped_pages = report.pages_skipped,
            inserted = report.inserted,
            existing = tally.existing(),
            stopped_early = report.stopped_early,
            "✅ partition done"
        );
        report
    }

    #[allow(clippy::too_many_arguments)]
    fn run_wave(
        &self,
        partition: &FetchPartition,
        pages: &[u32],
        workers: usize,
        gate: &mut DedupGate,
        tally: &mut PartitionTally,
        stop: &CancellationToken,
        report: &mut PartitionReport,
    ) {
        let queue = Mutex::new(pages.iter().copied().collect::<VecDeque<u32>>());
        let (tx, rx) = mpsc::channel::<(u32, PageOutcome)>();
        let adapter = self.adapter;
        let pacer = self.pacer;

        std::thread::scope(|scope| {
            for _ in 0..workers.clamp(1, pages.len().max(1)) {
                let tx = tx.clone();
                let queue = &queue;
                scope.spawn(move || {
                    while let Some(page) = next_page(queue) {
                        let outcome = if stop.is_cancelled() {
                            PageOutcome::Skipped
                        } else {
                            pacer.before_call();
                            // The pause may have outlasted the stop signal.
                            if stop.is_cancelled() {
                                PageOutcome::Skipped
                            } else {
                                match adapter.fetch_page(partition, page) {
                                    PageFetch::Fetched(raw) => PageOutcome::Fetched(raw),
                                    PageFetch::Failed { .. } => PageOutcome::Failed,
                                }
                            }
                        };
                        if tx.send((page, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for (page, outcome) in rx {
                match outcome {
                    PageOutcome::Fetched(raw) => {
                        tracing::debug!(partition = %partition, page, items = raw.items.len(), "page fetched");
                        if self.absorb_page(partition, raw, gate, tally, report) {
                            tracing::info!(
                                partition = %partition,
                                page,
                                existing = tally.existing(),
                                "🛑 early-stop threshold reached, cancelling remaining pages"
                            );
                            report.stopped_early = true;
                            stop.cancel();
                        }
                    }
                    PageOutcome::Failed => report.pages_failed += 1,
                    PageOutcome::Skipped => report.pages_skipped += 1,
                }
            }
        });
    }

    /// Transform, dedup and persist one page. Returns true when this page
    /// pushed the partition over the early-stop threshold.
    fn absorb_page(
        &self,
        partition: &FetchPartition,
        raw: RawPage,
        gate: &mut DedupGate,
        tally: &mut PartitionTally,
        report: &mut PartitionReport,
    ) -> bool {
        report.pages_fetched += 1;

        let mut records = Vec::with_capacity(raw.items.len());
        for item in &raw.items {
            match self.adapter.transform(partition, item) {
                Some(record) => records.push(record),
                None => report.malformed += 1,
            }
        }

        let admitted = gate.admit(records);
        report.already_seen += admitted.already_seen;
        report.malformed += admitted.invalid;

        let upsert = self.writer.upsert(&admitted.fresh);
        report.absorb_upsert(upsert);

        tally.record_existing(admitted.already_seen + upsert.skipped)
    }
}

fn next_page(queue: &Mutex<VecDeque<u32>>) -> Option<u32> {
    match queue.lock() {
        Ok(mut q) => q.pop_front(),
        Err(poisoned) => poisoned.into_inner().pop_front(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, Database, SqliteStore};
    use crate::domain::{PropertyRecord, Source};
    use crate::ingest::testing::{ids, Condition, FakeAdapter, GatedPacer};
    use crate::pacing::NoDelay;
    use crate::sources::SourceSettings;

    fn make_writer() -> (tempfile::TempDir, UpsertWriter<SqliteStore>) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("s.sqlite").to_string_lossy().to_string());
        init_db(&db, "sql/schema.sql").unwrap();
        (dir, UpsertWriter::new(SqliteStore::new(db), 1000, 1000))
    }

    fn seed(writer: &UpsertWriter<SqliteStore>, prefix: &str, n: usize) {
        let records: Vec<PropertyRecord> = (0..n)
            .map(|i| PropertyRecord::new(format!("{prefix}{i}"), Source::Zillow))
            .collect();
        writer.upsert(&records);
    }

    fn settings(workers: usize, wave_size: usize) -> SourceSettings {
        SourceSettings {
            workers,
            wave_size,
            page_size: 10,
            max_pages: 10,
        }
    }

    #[test]
    fn fetches_every_page_when_nothing_is_known() {
        let (_dir, writer) = make_writer();
        let adapter = FakeAdapter::new(settings(3, 2), 30)
            .page(1, ids("a", 10))
            .page(2, ids("b", 10))
            .page(3, ids("c", 10));
        let scheduler = FetchScheduler::new(&adapter, &writer, &NoDelay, 1000);

        let report = scheduler.run_partition(&adapter.partition(), &mut DedupGate::new(), &CancellationToken::new());

        assert_eq!(report.pages_planned, 3);
        assert_eq!(report.pages_fetched, 3);
        assert_eq!(report.inserted, 30);
        assert!(!report.stopped_early);
        let mut requested = adapter.requested();
        requested.sort();
        assert_eq!(requested, vec![1, 2, 3]);
    }

    #[test]
    fn threshold_crossed_on_first_page_schedules_nothing_else() {
        let (_dir, writer) = make_writer();
        seed(&writer, "a", 10);
        let adapter = FakeAdapter::new(settings(3, 3), 40)
            .page(1, ids("a", 10))
            .page(2, ids("b", 10));
        let scheduler = FetchScheduler::new(&adapter, &writer, &NoDelay, 10);

        let report = scheduler.run_partition(&adapter.partition(), &mut DedupGate::new(), &CancellationToken::new());

        assert!(report.stopped_early);
        assert_eq!(adapter.requested(), vec![1]);
        assert_eq!(report.pages_skipped, 3);
        assert_eq!(report.skipped, 10);
    }

    #[test]
    fn in_flight_pages_are_kept_after_a_mid_wave_stop() {
        let (_dir, writer) = make_writer();
        seed(&writer, "a", 10);
        seed(&writer, "b", 10);

        let stored = |id: &'static str| {
            let store = writer.store().clone();
            Box::new(move || {
                store
                    .exists_batch(&[id.to_string()])
                    .map(|found| !found.is_empty())
                    .unwrap_or(false)
            }) as Condition
        };

        // Both workers pick up pages 2 and 3 together. Page 2 crosses the
        // threshold while page 3 is held in flight until page 2 is persisted.
        // Later pacer calls (pages 4 and 5) are held until page 3 is persisted,
        // which only happens after the stop signal, so they are dropped.
        let mut page2 = ids("b", 10);
        page2.extend(ids("x", 1));
        let adapter = FakeAdapter::new(settings(2, 4), 50)
            .page(1, ids("a", 10))
            .page(2, page2)
            .gated_page(3, ids("c", 10), stored("x0"))
            .page(4, ids("d", 10))
            .page(5, ids("e", 10));
        let pacer = GatedPacer::new(1, 2, stored("c0"));
        let scheduler = FetchScheduler::new(&adapter, &writer, &pacer, 15);

        let report = scheduler.run_partition(&adapter.partition(), &mut DedupGate::new(), &CancellationToken::new());

        assert!(report.stopped_early);
        let mut requested = adapter.requested();
        requested.sort();
        assert_eq!(requested, vec![1, 2, 3]);
        assert_eq!(report.inserted, 11);
        assert_eq!(report.pages_skipped, 2);
        assert!(writer.store().exists_batch(&["c9".into()]).unwrap().contains("c9"));
        assert!(writer.store().exists_batch(&["d0".into()]).unwrap().is_empty());
    }

    #[test]
    fn failed_pages_do_not_abort_the_partition() {
        let (_dir, writer) = make_writer();
        let adapter = FakeAdapter::new(settings(2, 2), 30)
            .page(1, ids("a", 10))
            .failing_page(2)
            .page(3, ids("c", 10));
        let scheduler = FetchScheduler::new(&adapter, &writer, &NoDelay, 1000);

        let report = scheduler.run_partition(&adapter.partition(), &mut DedupGate::new(), &CancellationToken::new());

        assert_eq!(report.pages_failed, 1);
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.inserted, 20);
    }

    #[test]
    fn malformed_listings_are_dropped_individually() {
        let (_dir, writer) = make_writer();
        let mut items = ids("a", 3);
        items.push(serde_json::json!({"no_id": true}));
        let adapter = FakeAdapter::new(settings(1, 1), 4).page(1, items);
        let scheduler = FetchScheduler::new(&adapter, &writer, &NoDelay, 1000);

        let report = scheduler.run_partition(&adapter.partition(), &mut DedupGate::new(), &CancellationToken::new());

        assert_eq!(report.inserted, 3);
        assert_eq!(report.malformed, 1);
    }

    #[test]
    fn cancelled_token_skips_the_partition() {
        let (_dir, writer) = make_writer();
        let adapter = FakeAdapter::new(settings(1, 1), 10).page(1, ids("a", 10));
        let scheduler = FetchScheduler::new(&adapter, &writer, &NoDelay, 1000);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = scheduler.run_partition(&adapter.partition(), &mut DedupGate::new(), &cancel);

        assert!(report.cancelled);
        assert!(adapter.requested().is_empty());
    }
}
