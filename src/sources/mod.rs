//! Listing sources. Each adapter knows one site's request shape and how to turn
//! its listings into `PropertyRecord`s; pagination, dedup and persistence live
//! in `ingest`.

mod http;
mod lenient;
mod models;
mod realtor;
mod redfin;
pub mod regions;
mod retry;
mod source_error;
mod zillow;

pub use realtor::RealtorAdapter;
pub use redfin::RedfinAdapter;
pub use retry::{fetch_with_retry, PageFetch, RetryPolicy};
pub use source_error::SourceError;
pub use zillow::ZillowAdapter;

use crate::domain::{Category, FetchPartition, PropertyRecord, Source};
use serde_json::Value;

/// Scheduling knobs for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSettings {
    /// Concurrent page fetches within a wave.
    pub workers: usize,
    /// Pages submitted per wave; the wave drains before the next starts.
    pub wave_size: usize,
    pub page_size: usize,
    pub max_pages: u32,
}

impl SourceSettings {
    pub fn defaults_for(source: Source) -> Self {
        match source {
            Source::Realtor => Self {
                workers: 5,
                wave_size: 5,
                page_size: realtor::PAGE_SIZE,
                max_pages: realtor::MAX_PAGES,
            },
            Source::Zillow => Self {
                workers: 10,
                wave_size: 5,
                page_size: zillow::PAGE_SIZE,
                max_pages: zillow::MAX_PAGES,
            },
            Source::Redfin => Self {
                workers: 1,
                wave_size: 1,
                page_size: redfin::NUM_HOMES,
                max_pages: 1,
            },
        }
    }

    /// Pages to fetch for a partition, page 1 included. Never zero once page 1
    /// has been fetched.
    pub fn total_pages(&self, total_known: Option<usize>, first_page_len: usize) -> u32 {
        let total = total_known.unwrap_or(first_page_len);
        let pages = total.div_ceil(self.page_size.max(1));
        (pages.min(u32::MAX as usize) as u32).clamp(1, self.max_pages.max(1))
    }
}

/// One page of raw listings as the source returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    pub items: Vec<Value>,
    /// Total results for the whole partition, when the source reports it.
    pub total_known: Option<usize>,
}

impl RawPage {
    pub fn new(items: Vec<Value>, total_known: Option<usize>) -> Self {
        Self { items, total_known }
    }
}

pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    fn settings(&self) -> &SourceSettings;

    /// Property categories queried separately for every state.
    fn categories(&self) -> &'static [Category];

    fn supports_state(&self, state: &str) -> bool {
        regions::lookup(state).is_some()
    }

    /// A single HTTP attempt for `page` (1-based) of `partition`.
    fn request_page(&self, partition: &FetchPartition, page: u32) -> Result<RawPage, SourceError>;

    /// Canonical record for one raw listing, or `None` when required fields are
    /// missing or the listing cannot be decoded.
    fn transform(&self, partition: &FetchPartition, raw: &Value) -> Option<PropertyRecord>;

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    fn partitions(&self, states: &[String]) -> Vec<FetchPartition> {
        let mut out = Vec::new();
        for state in states {
            let Some(info) = regions::lookup(state).filter(|_| self.supports_state(state)) else {
                tracing::warn!(source = %self.source(), state = %state, "state not supported, skipping");
                continue;
            };
            for category in self.categories() {
                out.push(FetchPartition::new(self.source(), info.name, *category));
            }
        }
        out
    }

    /// Fetch with bounded retries. Never raises: exhausted or non-retryable
    /// failures come back as `PageFetch::Failed`.
    fn fetch_page(&self, partition: &FetchPartition, page: u32) -> PageFetch {
        let label = format!("{partition}#{page}");
        fetch_with_retry(self.retry_policy(), &label, || self.request_page(partition, page))
    }
}

pub fn adapter_for(source: Source) -> Result<Box<dyn SourceAdapter>, SourceError> {
    let settings = SourceSettings::defaults_for(source);
    Ok(match source {
        Source::Realtor => Box::new(RealtorAdapter::new(settings)?),
        Source::Zillow => Box::new(ZillowAdapter::new(settings)?),
        Source::Redfin => Box::new(RedfinAdapter::new(settings)?),
    })
}

fn non_empty(s: Option<String>) -> String {
    s.map(|s| s.trim().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_is_capped_by_source_limit() {
        let zillow = SourceSettings::defaults_for(Source::Zillow);
        assert_eq!(zillow.total_pages(Some(81), 40), 3);
        assert_eq!(zillow.total_pages(Some(100_000), 40), 25);

        let realtor = SourceSettings::defaults_for(Source::Realtor);
        assert_eq!(realtor.total_pages(Some(50_000), 200), 50);
    }

    #[test]
    fn total_pages_never_drops_below_one() {
        let realtor = SourceSettings::defaults_for(Source::Realtor);
        assert_eq!(realtor.total_pages(Some(0), 0), 1);
        assert_eq!(realtor.total_pages(None, 12), 1);
    }
}
