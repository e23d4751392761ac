use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend path used for `all`/`home` and for anything unrecognized.
pub const FALLBACK_FEED_PATH: &str = "/api/posts/all";

/// Logical name of a feed, independent of the backend path serving it.
///
/// Parsed from strings like `all`, `thread/42` or `user/ada`. The `posts/`
/// prefix used by older deep links is accepted and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ResourceSelector {
    All,
    Home,
    Thread(String),
    User(String),
    Saved,
    /// Anything the mapping table does not know; kept verbatim for logging.
    Unknown(String),
}

impl ResourceSelector {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim().trim_matches('/');
        let name = trimmed.strip_prefix("posts/").unwrap_or(trimmed);

        match name {
            "" | "all" => Self::All,
            "home" => Self::Home,
            "saved" => Self::Saved,
            _ => match name.split_once('/') {
                Some(("thread", id)) if is_segment(id) => Self::Thread(id.to_string()),
                Some(("user", username)) if is_segment(username) => {
                    Self::User(username.to_string())
                }
                _ => Self::Unknown(raw.to_string()),
            },
        }
    }

    /// Backend path for this selector, or `None` when it is not in the table.
    pub fn api_path(&self) -> Option<String> {
        match self {
            Self::All | Self::Home => Some(FALLBACK_FEED_PATH.to_string()),
            Self::Thread(id) => Some(format!("/api/posts/thread/{id}")),
            Self::User(username) => Some(format!("/api/posts/user/{username}")),
            Self::Saved => Some("/api/posts/saved".to_string()),
            Self::Unknown(_) => None,
        }
    }

    /// Feeds that only make sense for a signed-in user. Anonymous sessions
    /// get a login prompt instead of a fetch, and a 401 on them is a login
    /// prompt rather than an error.
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::Home | Self::Saved)
    }
}

/// A single path segment that can be placed in a URL path verbatim.
fn is_segment(value: &str) -> bool {
    !value.is_empty()
        && !value
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
}

impl fmt::Display for ResourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Home => write!(f, "home"),
            Self::Thread(id) => write!(f, "thread/{id}"),
            Self::User(username) => write!(f, "user/{username}"),
            Self::Saved => write!(f, "saved"),
            Self::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}

impl From<String> for ResourceSelector {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<ResourceSelector> for String {
    fn from(selector: ResourceSelector) -> Self {
        selector.to_string()
    }
}
