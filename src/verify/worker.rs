//! Sequential verification: select a batch, check each property in order,
//! write outcomes back, repeat until drained, limited, cancelled or tripped.

use crate::db::verification_runs::{end_verification_run, start_verification_run};
use crate::db::{Database, PropertyStore, SelectedProperty, SelectionCursor, SelectionQuery, StatusUpdateReport};
use crate::domain::{FailureReason, PropertyRecord, Source, VerificationCounts, VerificationOutcome};
use crate::pacing::Pacer;
use crate::verify::breaker::CircuitBreaker;
use crate::verify::client::{CheckResponse, VerificationService};
use crate::verify::progress::{ProgressReporter, VerificationProgress};
use crate::verify::updater::StatusUpdater;
use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

pub const MIN_SQUARE_FOOTAGE: f64 = 800.0;

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOptions {
    pub batch_size: usize,
    pub status_batch_size: usize,
    pub source: Option<Source>,
    pub include_soft_failed: bool,
    pub api_error_only: bool,
    /// Stop after this many properties.
    pub limit: Option<usize>,
    pub breaker_threshold: u32,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            status_batch_size: 100,
            source: None,
            include_soft_failed: true,
            api_error_only: false,
            limit: None,
            breaker_threshold: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    Drained,
    LimitReached,
    Cancelled,
    CircuitTripped { message: String },
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Drained => "drained",
            RunOutcome::LimitReached => "limit_reached",
            RunOutcome::Cancelled => "cancelled",
            RunOutcome::CircuitTripped { .. } => "circuit_tripped",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub run_id: Option<i64>,
    pub outcome: RunOutcome,
    pub counts: VerificationCounts,
    pub status: StatusUpdateReport,
    pub failed_writes: usize,
}

#[derive(Debug)]
enum WorkerState {
    Idle,
    FetchingBatch,
    ProcessingItem(VecDeque<SelectedProperty>),
    Done(RunOutcome),
}

pub struct VerificationWorker<'a, S: ?Sized> {
    store: &'a S,
    service: &'a dyn VerificationService,
    pacer: &'a dyn Pacer,
    options: VerifyOptions,
    journal: Option<Database>,
}

impl<'a, S: PropertyStore + ?Sized> VerificationWorker<'a, S> {
    pub fn new(
        store: &'a S,
        service: &'a dyn VerificationService,
        pacer: &'a dyn Pacer,
        options: VerifyOptions,
    ) -> Self {
        Self {
            store,
            service,
            pacer,
            options,
            journal: None,
        }
    }

    /// Records each run in `verification_runs`.
    pub fn with_journal(mut self, db: Database) -> Self {
        self.journal = Some(db);
        self
    }

    /// Local rules first, then one external call. Only the external call is
    /// paced; items rejected locally never reach the service and run back to
    /// back, so the pause-every-N count tracks real requests.
    pub fn check(&self, record: &PropertyRecord) -> VerificationOutcome {
        let id = record.property_id.as_str();

        if record.square_footage < MIN_SQUARE_FOOTAGE {
            tracing::debug!(property_id = id, sqft = record.square_footage, "square footage below minimum");
            return VerificationOutcome::failed(id, FailureReason::SquareFootage);
        }
        if record.address.trim().is_empty() {
            tracing::warn!(property_id = id, "no address, cannot check");
            return VerificationOutcome::failed(id, FailureReason::NoAddress);
        }

        self.pacer.before_call();
        match self.service.check_address(&record.address) {
            Ok(CheckResponse::Interested { reason }) => {
                tracing::info!(property_id = id, reason = ?reason, "✅ verified");
                VerificationOutcome::verified(id)
            }
            Ok(CheckResponse::NotInterested { reason }) => {
                tracing::info!(property_id = id, reason = ?reason, "not interested");
                VerificationOutcome::failed(id, FailureReason::NotInterested)
            }
            Ok(CheckResponse::RateLimited { message }) => {
                tracing::warn!(property_id = id, message = %message, "⚠️ rate limited");
                VerificationOutcome::failed(id, FailureReason::ApiError)
            }
            Ok(CheckResponse::ApiError { status, detail }) => {
                tracing::warn!(property_id = id, status, detail = %detail, "⚠️ verification service error");
                VerificationOutcome::failed(id, FailureReason::ApiError)
            }
            Err(e) => {
                tracing::error!(property_id = id, error = %e, "❌ verification call failed");
                VerificationOutcome::failed(id, FailureReason::ApiError)
            }
        }
    }

    pub fn run(&self, cancel: &CancellationToken, reporter: &dyn ProgressReporter) -> VerificationReport {
        let run_id = self.journal_start();
        let mut breaker = CircuitBreaker::new(self.options.breaker_threshold);
        let mut updater = StatusUpdater::new(self.store, self.options.status_batch_size);
        let mut progress = VerificationProgress {
            running: true,
            ..Default::default()
        };
        let mut cursor: Option<SelectionCursor> = None;
        let mut state = WorkerState::Idle;

        reporter.report(&progress);
        tracing::info!(options = ?self.options, "🔎 verification run started");

        let outcome = loop {
            state = match state {
                WorkerState::Idle => WorkerState::FetchingBatch,

                WorkerState::FetchingBatch => self.fetch_batch(&progress, cursor.as_ref(), cancel),

                WorkerState::ProcessingItem(mut batch) => match batch.pop_front() {
                    None => {
                        progress.batches += 1;
                        reporter.report(&progress);
                        WorkerState::FetchingBatch
                    }
                    Some(_) if cancel.is_cancelled() => WorkerState::Done(RunOutcome::Cancelled),
                    Some(item) => {
                        let outcome = self.check(&item.record);
                        cursor = Some(item.cursor);
                        progress.counts.record(&outcome);
                        let tripped = breaker.record(outcome.failure_reason);
                        updater.push(outcome);

                        if tripped {
                            let message = format!(
                                "Halted after {} consecutive API errors; remaining properties stay eligible for a later run",
                                breaker.consecutive_errors()
                            );
                            tracing::error!(threshold = breaker.threshold(), "🛑 circuit breaker tripped");
                            WorkerState::Done(RunOutcome::CircuitTripped { message })
                        } else {
                            WorkerState::ProcessingItem(batch)
                        }
                    }
                },

                WorkerState::Done(outcome) => break outcome,
            };
        };

        updater.flush();

        progress.running = false;
        progress.halted = matches!(outcome, RunOutcome::CircuitTripped { .. });
        progress.message = Some(match &outcome {
            RunOutcome::CircuitTripped { message } => message.clone(),
            RunOutcome::Drained => "No more properties to verify".to_string(),
            RunOutcome::LimitReached => "Reached the requested limit".to_string(),
            RunOutcome::Cancelled => "Run cancelled".to_string(),
        });
        reporter.report(&progress);

        self.journal_end(run_id, &progress, &outcome);
        tracing::info!(
            outcome = outcome.as_str(),
            processed = progress.counts.processed,
            verified = progress.counts.verified,
            failed = progress.counts.failed,
            api_error = progress.counts.api_error,
            "verification run finished"
        );

        VerificationReport {
            run_id,
            outcome,
            counts: progress.counts,
            status: updater.totals(),
            failed_writes: updater.failed_writes(),
        }
    }

    fn fetch_batch(
        &self,
        progress: &VerificationProgress,
        cursor: Option<&SelectionCursor>,
        cancel: &CancellationToken,
    ) -> WorkerState {
        if cancel.is_cancelled() {
            return WorkerState::Done(RunOutcome::Cancelled);
        }

        let processed = progress.counts.processed as usize;
        let batch_size = match self.options.limit {
            Some(limit) if processed >= limit => return WorkerState::Done(RunOutcome::LimitReached),
            Some(limit) => self.options.batch_size.min(limit - processed),
            None => self.options.batch_size,
        };

        let query = SelectionQuery {
            batch_size: batch_size.max(1),
            source: self.options.source,
            include_soft_failed: self.options.include_soft_failed,
            api_error_only: self.options.api_error_only,
            after: cursor.cloned(),
        };

        match self.store.select_unverified(&query) {
            Ok(batch) if batch.is_empty() => WorkerState::Done(RunOutcome::Drained),
            Ok(batch) => {
                tracing::info!(size = batch.len(), "🔄 processing batch");
                WorkerState::ProcessingItem(batch.into())
            }
            Err(e) => {
                // Retries are exhausted by now; end the run as if drained.
                tracing::error!(error = %e, "❌ selecting properties failed");
                WorkerState::Done(RunOutcome::Drained)
            }
        }
    }

    fn journal_start(&self) -> Option<i64> {
        let db = self.journal.as_ref()?;
        match db.with_retry("start_verification_run", |conn| {
            start_verification_run(conn, Utc::now().timestamp())
        }) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(error = %e, "could not journal verification run start");
                None
            }
        }
    }

    fn journal_end(&self, run_id: Option<i64>, progress: &VerificationProgress, outcome: &RunOutcome) {
        let (Some(db), Some(id)) = (self.journal.as_ref(), run_id) else {
            return;
        };
        let halt_message = match outcome {
            RunOutcome::CircuitTripped { message } => Some(message.as_str()),
            _ => None,
        };
        if let Err(e) = db.with_retry("end_verification_run", |conn| {
            end_verification_run(
                conn,
                id,
                Utc::now().timestamp(),
                &progress.counts,
                outcome.as_str(),
                halt_message,
            )
        }) {
            tracing::error!(run_id = id, error = %e, "could not journal verification run end");
        }
    }
}
