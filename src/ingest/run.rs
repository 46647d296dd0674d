use crate::db::scrapes::{end_scrape_run, start_scrape_run, ScrapeRunTotals};
use crate::db::SqliteStore;
use crate::domain::Source;
use crate::ingest::dedup::DedupGate;
use crate::ingest::scheduler::{FetchScheduler, PartitionReport};
use crate::ingest::writer::UpsertWriter;
use crate::pacing::{JitteredPacer, Pacer};
use crate::sources::SourceAdapter;
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    pub early_stop_threshold: usize,
    pub exists_chunk: usize,
    pub upsert_batch: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            early_stop_threshold: 1000,
            exists_chunk: 1000,
            upsert_batch: 1000,
        }
    }
}

/// Cumulative state of an ingestion run, reported after each partition.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestProgress {
    pub source: Option<Source>,
    pub current_partition: Option<String>,
    pub partitions_done: usize,
    pub partitions_total: usize,
    pub pages_fetched: u32,
    pub pages_failed: u32,
    pub inserted: usize,
    pub skipped: usize,
    pub partitions_stopped_early: usize,
    pub running: bool,
    pub cancelled: bool,
    pub message: Option<String>,
}

impl IngestProgress {
    fn absorb(&mut self, report: &PartitionReport) {
        self.current_partition = Some(report.partition.clone());
        self.partitions_done += 1;
        self.pages_fetched += report.pages_fetched;
        self.pages_failed += report.pages_failed;
        self.inserted += report.inserted;
        self.skipped += report.skipped + report.already_seen;
        if report.stopped_early {
            self.partitions_stopped_early += 1;
        }
    }
}

pub trait IngestReporter: Send + Sync {
    fn report(&self, progress: &IngestProgress);
}

impl<F> IngestReporter for F
where
    F: Fn(&IngestProgress) + Send + Sync,
{
    fn report(&self, progress: &IngestProgress) {
        self(progress)
    }
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub run_id: Option<i64>,
    pub partitions: Vec<PartitionReport>,
    pub progress: IngestProgress,
}

/// Runs a source's partitions one after another, sharing one seen-set.
pub struct Ingestor {
    adapter: Box<dyn SourceAdapter>,
    writer: UpsertWriter<SqliteStore>,
    settings: IngestSettings,
    request_pacer: Box<dyn Pacer>,
    partition_pacer: Box<dyn Pacer>,
}

impl Ingestor {
    pub fn new(adapter: Box<dyn SourceAdapter>, store: SqliteStore, settings: IngestSettings) -> Self {
        Self {
            adapter,
            writer: UpsertWriter::new(store, settings.exists_chunk, settings.upsert_batch),
            settings,
            request_pacer: Box::new(JitteredPacer::new(Duration::from_secs(2), Duration::from_secs(4))),
            partition_pacer: Box::new(JitteredPacer::new(Duration::from_secs(4), Duration::from_secs(7))),
        }
    }

    pub fn with_pacing(mut self, request: Box<dyn Pacer>, partition: Box<dyn Pacer>) -> Self {
        self.request_pacer = request;
        self.partition_pacer = partition;
        self
    }

    pub fn run(
        &self,
        states: &[String],
        cancel: &CancellationToken,
        reporter: &dyn IngestReporter,
    ) -> IngestSummary {
        let source = self.adapter.source();
        let partitions = self.adapter.partitions(states);
        let db = self.writer.store().database();

        let run_id = match db.with_retry("start_scrape_run", |conn| {
            start_scrape_run(conn, source, states, Utc::now().timestamp())
        }) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(source = %source, error = %e, "could not journal scrape run start");
                None
            }
        };

        tracing::info!(source = %source, partitions = partitions.len(), "🧵 ingestion run started");

        let mut progress = IngestProgress {
            source: Some(source),
            partitions_total: partitions.len(),
            running: true,
            ..Default::default()
        };
        reporter.report(&progress);

        let scheduler = FetchScheduler::new(
            self.adapter.as_ref(),
            &self.writer,
            self.request_pacer.as_ref(),
            self.settings.early_stop_threshold,
        );
        let mut gate = DedupGate::new();
        let mut reports = Vec::with_capacity(partitions.len());

        for (i, partition) in partitions.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            if i > 0 {
                self.partition_pacer.before_call();
            }

            let report = scheduler.run_partition(partition, &mut gate, cancel);
            progress.absorb(&report);
            reporter.report(&progress);
            reports.push(report);
        }

        progress.running = false;
        progress.cancelled = cancel.is_cancelled();
        progress.message = Some(if progress.cancelled {
            "Run cancelled".to_string()
        } else if progress.pages_failed > 0 {
            format!("Finished with {} failed pages", progress.pages_failed)
        } else {
            "Finished".to_string()
        });

        if let Some(id) = run_id {
            let totals = ScrapeRunTotals {
                pages_fetched: progress.pages_fetched as usize,
                inserted: progress.inserted,
                skipped: progress.skipped,
            };
            let error = (progress.cancelled || progress.pages_failed > 0)
                .then(|| progress.message.clone())
                .flatten();
            if let Err(e) = db.with_retry("end_scrape_run", |conn| {
                end_scrape_run(conn, id, Utc::now().timestamp(), &totals, !progress.cancelled, error.clone())
            }) {
                tracing::error!(source = %source, run_id = id, error = %e, "could not journal scrape run end");
            }
        }

        tracing::info!(
            source = %source,
            inserted = progress.inserted,
            skipped = progress.skipped,
            pages = progress.pages_fetched,
            cancelled = progress.cancelled,
            "✅ ingestion run finished"
        );
        reporter.report(&progress);

        IngestSummary {
            run_id,
            partitions: reports,
            progress,
        }
    }
}
