use serde::{Deserialize, Serialize};
use std::fmt;

use super::filter::{FeedFilters, SortBy, TimeWindow};
use super::selector::ResourceSelector;

/// Identity of one logical feed: selector plus both filter dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedQueryKey {
    pub selector: ResourceSelector,
    pub sort_by: SortBy,
    pub window: TimeWindow,
}

impl FeedQueryKey {
    pub fn new(selector: ResourceSelector, filters: FeedFilters) -> Self {
        Self {
            selector,
            sort_by: filters.sort_by,
            window: filters.window,
        }
    }

    pub fn filters(&self) -> FeedFilters {
        FeedFilters::new(self.sort_by, self.window)
    }

    /// Query cache key, e.g. `posts:thread/42:top:alltime`.
    pub fn cache_key(&self) -> String {
        format!("posts:{}:{}:{}", self.selector, self.sort_by, self.window)
    }
}

impl fmt::Display for FeedQueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.selector, self.sort_by, self.window)
    }
}
