//! Shared dashboard state: the database handle, config, and the live status of
//! background runs.

use crate::config::PipelineConfig;
use crate::db::Database;
use crate::domain::Source;
use crate::ingest::IngestProgress;
use crate::runs::RunLauncher;
use crate::verify::VerificationProgress;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<PipelineConfig>,
    pub status: StatusRegistry,
    pub launcher: Arc<dyn RunLauncher>,
}

impl AppState {
    pub fn new(db: Database, config: PipelineConfig, launcher: Arc<dyn RunLauncher>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            status: StatusRegistry::default(),
            launcher,
        }
    }
}

#[derive(Default)]
struct Registry {
    ingest: BTreeMap<&'static str, IngestProgress>,
    ingest_tokens: BTreeMap<&'static str, CancellationToken>,
    verification: Option<VerificationProgress>,
    verification_token: Option<CancellationToken>,
}

/// Latest progress per run, written by the pipeline's reporters and read by
/// the status routes. At most one run per source, and one verification run.
#[derive(Clone, Default)]
pub struct StatusRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl StatusRegistry {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panicking reporter leaves plain data behind; keep serving it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claims the ingestion slot for `source`. `None` when a run is active.
    pub fn begin_ingest(&self, source: Source) -> Option<CancellationToken> {
        let mut reg = self.lock();
        if reg.ingest_tokens.contains_key(source.as_str()) {
            return None;
        }
        let token = CancellationToken::new();
        reg.ingest_tokens.insert(source.as_str(), token.clone());
        reg.ingest.insert(
            source.as_str(),
            IngestProgress {
                source: Some(source),
                running: true,
                ..Default::default()
            },
        );
        Some(token)
    }

    pub fn update_ingest(&self, source: Source, progress: IngestProgress) {
        self.lock().ingest.insert(source.as_str(), progress);
    }

    pub fn finish_ingest(&self, source: Source) {
        let mut reg = self.lock();
        reg.ingest_tokens.remove(source.as_str());
        if let Some(p) = reg.ingest.get_mut(source.as_str()) {
            p.running = false;
        }
    }

    pub fn cancel_ingest(&self, source: Source) -> bool {
        match self.lock().ingest_tokens.get(source.as_str()) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn ingest_snapshot(&self) -> BTreeMap<&'static str, IngestProgress> {
        self.lock().ingest.clone()
    }

    pub fn begin_verification(&self) -> Option<CancellationToken> {
        let mut reg = self.lock();
        if reg.verification_token.is_some() {
            return None;
        }
        let token = CancellationToken::new();
        reg.verification_token = Some(token.clone());
        reg.verification = Some(VerificationProgress {
            running: true,
            ..Default::default()
        });
        Some(token)
    }

    pub fn update_verification(&self, progress: VerificationProgress) {
        self.lock().verification = Some(progress);
    }

    pub fn finish_verification(&self) {
        let mut reg = self.lock();
        reg.verification_token = None;
        if let Some(p) = reg.verification.as_mut() {
            p.running = false;
        }
    }

    pub fn cancel_verification(&self) -> bool {
        match &self.lock().verification_token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn verification_snapshot(&self) -> VerificationProgress {
        self.lock().verification.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSlot {
    Ingest(Source),
    Verification,
}

/// Frees a claimed slot when dropped, including during a panic unwind.
pub struct SlotRelease {
    registry: StatusRegistry,
    slot: RunSlot,
}

impl StatusRegistry {
    pub fn release_on_drop(&self, slot: RunSlot) -> SlotRelease {
        SlotRelease {
            registry: self.clone(),
            slot,
        }
    }
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!(slot = ?self.slot, "run panicked; releasing its slot");
        }
        match self.slot {
            RunSlot::Ingest(source) => self.registry.finish_ingest(source),
            RunSlot::Verification => self.registry.finish_verification(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_ingestion_run_per_source() {
        let registry = StatusRegistry::default();
        let token = registry.begin_ingest(Source::Zillow).unwrap();

        assert!(registry.begin_ingest(Source::Zillow).is_none());
        assert!(registry.begin_ingest(Source::Redfin).is_some());

        assert!(registry.cancel_ingest(Source::Zillow));
        assert!(token.is_cancelled());

        registry.finish_ingest(Source::Zillow);
        assert!(!registry.ingest_snapshot()["zillow"].running);
        assert!(registry.begin_ingest(Source::Zillow).is_some());
    }

    #[test]
    fn verification_slot_is_exclusive() {
        let registry = StatusRegistry::default();
        assert!(registry.begin_verification().is_some());
        assert!(registry.begin_verification().is_none());
        assert!(registry.verification_snapshot().running);

        registry.finish_verification();
        assert!(!registry.verification_snapshot().running);
        assert!(!registry.cancel_verification());
    }

    #[test]
    fn panicking_run_still_frees_its_slot() {
        let registry = StatusRegistry::default();
        registry.begin_ingest(Source::Realtor).unwrap();
        registry.begin_verification().unwrap();

        let worker = registry.clone();
        let joined = std::thread::spawn(move || {
            let _ingest = worker.release_on_drop(RunSlot::Ingest(Source::Realtor));
            let _verify = worker.release_on_drop(RunSlot::Verification);
            panic!("adapter blew up");
        })
        .join();
        assert!(joined.is_err());

        assert!(registry.begin_ingest(Source::Realtor).is_some());
        assert!(registry.begin_verification().is_some());
    }
}
