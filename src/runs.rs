//! Background runs started from the dashboard.

use crate::app::{AppState, RunSlot};
use crate::db::SqliteStore;
use crate::domain::Source;
use crate::errors::ServerError;
use crate::ingest::{IngestProgress, Ingestor};
use crate::pacing::JitteredPacer;
use crate::sources::adapter_for;
use crate::verify::{AddressCheckClient, VerificationProgress, VerificationWorker, VerifyOptions};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Starts runs off the request thread. The registry slot is already claimed
/// when these are called; a started run releases it when it ends, and the
/// caller releases it if launching fails.
pub trait RunLauncher: Send + Sync {
    fn launch_ingest(
        &self,
        app: &AppState,
        source: Source,
        states: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<(), ServerError>;

    fn launch_verification(
        &self,
        app: &AppState,
        options: VerifyOptions,
        cancel: CancellationToken,
    ) -> Result<(), ServerError>;
}

/// One OS thread per run.
pub struct ThreadLauncher;

impl RunLauncher for ThreadLauncher {
    fn launch_ingest(
        &self,
        app: &AppState,
        source: Source,
        states: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<(), ServerError> {
        let adapter = adapter_for(source).map_err(|e| {
            tracing::error!(source = %source, error = %e, "adapter init failed");
            ServerError::InternalError
        })?;
        let store = SqliteStore::new(app.db.clone());
        let settings = app.config.ingest_settings();
        let registry = app.status.clone();

        std::thread::Builder::new()
            .name(format!("ingest-{source}"))
            .spawn(move || {
                let _release = registry.release_on_drop(RunSlot::Ingest(source));
                tracing::info!(source = %source, states = ?states, "🧵 ingestion thread started");
                let ingestor = Ingestor::new(adapter, store, settings);
                let reporter = |p: &IngestProgress| registry.update_ingest(source, p.clone());
                ingestor.run(&states, &cancel, &reporter);
            })
            .map_err(|e| {
                tracing::error!(error = %e, "could not spawn ingestion thread");
                ServerError::InternalError
            })?;

        Ok(())
    }

    fn launch_verification(
        &self,
        app: &AppState,
        options: VerifyOptions,
        cancel: CancellationToken,
    ) -> Result<(), ServerError> {
        let client = AddressCheckClient::new(&app.config.check_address_base_url).map_err(|e| {
            tracing::error!(error = %e, "verification client init failed");
            ServerError::InternalError
        })?;
        let db = app.db.clone();
        let registry = app.status.clone();
        let pacer = JitteredPacer::new(Duration::from_millis(100), Duration::from_millis(300))
            .with_pause_every(app.config.pause_every_calls, app.config.pause);

        std::thread::Builder::new()
            .name("verification".into())
            .spawn(move || {
                let _release = registry.release_on_drop(RunSlot::Verification);
                let store = SqliteStore::new(db.clone());
                let worker = VerificationWorker::new(&store, &client, &pacer, options).with_journal(db);
                let reporter = |p: &VerificationProgress| registry.update_verification(p.clone());
                worker.run(&cancel, &reporter);
            })
            .map_err(|e| {
                tracing::error!(error = %e, "could not spawn verification thread");
                ServerError::InternalError
            })?;

        Ok(())
    }
}
