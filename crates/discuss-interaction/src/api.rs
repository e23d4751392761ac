//! Typed calls against the forum backend.

use crate::transport::Transport;
use discuss_core::Result;
use discuss_core::feed::FeedFilters;
use discuss_core::post::{PAGE_SIZE, Post};
use discuss_core::user::UserProfile;
use std::sync::Arc;

pub const PROFILE_PATH: &str = "/api/user";
pub const LOGOUT_PATH: &str = "/api/user/logout";

/// Query string of one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: usize,
    /// Item offset (page offset × page size).
    pub offset: usize,
    pub filters: FeedFilters,
}

impl PageQuery {
    /// Query for the page at `page_offset`.
    pub fn for_page(page_offset: usize, filters: FeedFilters) -> Self {
        Self {
            limit: PAGE_SIZE,
            offset: page_offset * PAGE_SIZE,
            filters,
        }
    }

    fn to_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("sortby", self.filters.sort_by.to_string()),
            ("duration", self.filters.window.to_string()),
        ]
    }
}

#[derive(Clone)]
pub struct ForumApi {
    transport: Arc<Transport>,
}

impl ForumApi {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub async fn fetch_posts(&self, path: &str, query: &PageQuery) -> Result<Vec<Post>> {
        tracing::debug!(
            "[ForumApi] Fetching posts {} (offset {}, {} / {})",
            path,
            query.offset,
            query.filters.sort_by,
            query.filters.window
        );
        let posts: Vec<Post> = self.transport.get_json(path, &query.to_pairs()).await?;
        tracing::debug!("[ForumApi] Received {} post(s) from {}", posts.len(), path);
        Ok(posts)
    }

    pub async fn fetch_profile(&self) -> Result<UserProfile> {
        self.transport.get_json(PROFILE_PATH, &[]).await
    }

    /// Asks the backend to end the session. The response body is ignored.
    pub async fn logout(&self) -> Result<()> {
        self.transport.get(LOGOUT_PATH, &[]).await.map(|_| ())
    }
}
