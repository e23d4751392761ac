use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of posts requested per page. A shorter page marks the end of a feed.
pub const PAGE_SIZE: usize = 20;

/// A post as listed by the `/api/posts/*` endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_info: PostInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_info: Option<PostThread>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<PostAuthor>,
    /// Vote state and other per-viewer fields the client passes through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostInfo {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub post_karma: i64,
    #[serde(default)]
    pub comments_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostThread {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAuthor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
}

impl Post {
    pub fn id(&self) -> i64 {
        self.post_info.id
    }
}

/// One fetched batch of posts, tagged with the page offset it was requested at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub posts: Vec<Post>,
}

impl Page {
    pub fn new(offset: usize, posts: Vec<Post>) -> Self {
        Self { offset, posts }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// A full page means the backend may have more.
    pub fn is_full(&self) -> bool {
        self.posts.len() >= PAGE_SIZE
    }
}
