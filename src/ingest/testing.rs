//! Scripted source and pacer for scheduler and ingestor tests.

use crate::domain::{Category, FetchPartition, PropertyRecord, Source};
use crate::pacing::Pacer;
use crate::sources::{RawPage, RetryPolicy, SourceAdapter, SourceError, SourceSettings};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Barrier, Mutex};
use std::time::{Duration, Instant};

/// A condition a scripted page or pacer waits on.
pub type Condition = Box<dyn Fn() -> bool + Send + Sync>;

/// Polls `cond` until it holds. Panics after ten seconds so a broken ordering
/// fails the test instead of hanging it.
pub fn wait_until(cond: &Condition) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "condition never became true");
        std::thread::sleep(Duration::from_millis(2));
    }
}

pub fn ids(prefix: &str, n: usize) -> Vec<Value> {
    (0..n).map(|i| json!({ "id": format!("{prefix}{i}") })).collect()
}

enum Script {
    Items(Vec<Value>, Option<Condition>),
    Fail,
}

pub struct FakeAdapter {
    settings: SourceSettings,
    total: usize,
    pages: HashMap<u32, Script>,
    requested: Mutex<Vec<u32>>,
}

impl FakeAdapter {
    pub fn new(settings: SourceSettings, total: usize) -> Self {
        Self {
            settings,
            total,
            pages: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn page(mut self, page: u32, items: Vec<Value>) -> Self {
        self.pages.insert(page, Script::Items(items, None));
        self
    }

    /// A page whose request does not return until `until` holds.
    pub fn gated_page(mut self, page: u32, items: Vec<Value>, until: Condition) -> Self {
        self.pages.insert(page, Script::Items(items, Some(until)));
        self
    }

    pub fn failing_page(mut self, page: u32) -> Self {
        self.pages.insert(page, Script::Fail);
        self
    }

    pub fn partition(&self) -> FetchPartition {
        FetchPartition::new(Source::Zillow, "Ohio", Category::SingleFamily)
    }

    pub fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

impl SourceAdapter for FakeAdapter {
    fn source(&self) -> Source {
        Source::Zillow
    }

    fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::SingleFamily]
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::immediate(3)
    }

    fn request_page(&self, _partition: &FetchPartition, page: u32) -> Result<RawPage, SourceError> {
        self.requested.lock().unwrap().push(page);
        match self.pages.get(&page) {
            Some(Script::Items(items, gate)) => {
                if let Some(cond) = gate {
                    wait_until(cond);
                }
                Ok(RawPage::new(items.clone(), Some(self.total)))
            }
            Some(Script::Fail) => Err(SourceError::Status {
                status: 503,
                body: "unavailable".into(),
            }),
            None => Ok(RawPage::new(Vec::new(), Some(self.total))),
        }
    }

    fn transform(&self, partition: &FetchPartition, raw: &Value) -> Option<PropertyRecord> {
        let id = raw["id"].as_str()?;
        let mut record = PropertyRecord::new(id, Source::Zillow);
        record.state = partition.state.clone();
        Some(record)
    }
}

/// Lets the first `free` calls through, then holds the next `together` calls
/// until all of them have arrived, then makes every later call wait for `then`.
pub struct GatedPacer {
    free: u64,
    together: u64,
    barrier: Barrier,
    then: Condition,
    calls: AtomicU64,
}

impl GatedPacer {
    pub fn new(free: u64, together: usize, then: Condition) -> Self {
        Self {
            free,
            together: together as u64,
            barrier: Barrier::new(together),
            then,
            calls: AtomicU64::new(0),
        }
    }
}

impl Pacer for GatedPacer {
    fn before_call(&self) {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.free {
            return;
        }
        if call < self.free + self.together {
            self.barrier.wait();
            return;
        }
        wait_until(&self.then);
    }
}
