// src/domain/partition.rs

use crate::domain::property::Source;
use std::fmt;

/// Which slice of a source's inventory a partition covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    SingleFamily,
    MultiFamily,
    /// Sources that return every home type in one query.
    All,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SingleFamily => "single_family",
            Category::MultiFamily => "multi_family",
            Category::All => "all",
        }
    }
}

/// One (source, state, category) unit of scraping work. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchPartition {
    pub source: Source,
    /// Full state name, e.g. "North Carolina".
    pub state: String,
    pub category: Category,
}

impl FetchPartition {
    pub fn new(source: Source, state: impl Into<String>, category: Category) -> Self {
        Self {
            source,
            state: state.into(),
            category,
        }
    }
}

impl fmt::Display for FetchPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.source, self.state, self.category.as_str())
    }
}
