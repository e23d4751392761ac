use serde::{Deserialize, Serialize};

use super::key::FeedQueryKey;
use crate::error::DiscussError;
use crate::post::{Page, Post};

/// Accumulated pages of one feed.
///
/// `pages` only grows for a given key; a new key always starts from an empty
/// state. `has_next_page` mirrors the length of the last page fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedState {
    pub key: FeedQueryKey,
    pub pages: Vec<Page>,
    pub is_fetching: bool,
    pub has_next_page: bool,
    pub error: Option<DiscussError>,
    /// Set when a feed that needs an account was refused, or was opened
    /// without a session. The view renders a login prompt instead of an error.
    pub auth_required: bool,
}

impl FeedState {
    pub fn new(key: FeedQueryKey) -> Self {
        Self {
            key,
            pages: Vec::new(),
            is_fetching: false,
            has_next_page: true,
            error: None,
            auth_required: false,
        }
    }

    /// Starts from previously fetched pages (e.g. a fresh cache entry).
    pub fn with_pages(key: FeedQueryKey, pages: Vec<Page>) -> Self {
        let has_next_page = pages.last().is_none_or(Page::is_full);
        Self {
            pages,
            has_next_page,
            ..Self::new(key)
        }
    }

    /// Offset of the page that would be fetched next.
    pub fn next_offset(&self) -> usize {
        self.pages.len()
    }

    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.pages.iter().flat_map(|page| page.posts.iter())
    }

    pub fn total_posts(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// The first page came back empty: nothing matches these filters.
    pub fn is_empty_result(&self) -> bool {
        self.pages.first().is_some_and(Page::is_empty)
    }
}
