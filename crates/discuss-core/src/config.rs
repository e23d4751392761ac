//! Client configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer; every field has a
//! default so a missing or partial file still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base URL used when neither the environment nor the config file sets one.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Environment variable that overrides `api_url`.
pub const API_URL_ENV: &str = "DISCUSS_API_URL";

/// Public route the session controller navigates to after logout.
pub const DEFAULT_LANDING_ROUTE: &str = "/all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the forum API, without a trailing slash.
    pub api_url: String,
    /// Hard timeout applied to every outbound request.
    pub request_timeout_secs: u64,
    /// Upper bound on the best-effort server logout call.
    pub logout_timeout_secs: u64,
    pub landing_route: String,
    /// Reject unknown resource selectors instead of falling back to `all`.
    pub strict_selectors: bool,
    /// How long cached feed pages and profiles are considered fresh.
    pub cache_stale_secs: u64,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 30,
            logout_timeout_secs: 5,
            landing_route: DEFAULT_LANDING_ROUTE.to_string(),
            strict_selectors: false,
            cache_stale_secs: 120,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn logout_timeout(&self) -> Duration {
        Duration::from_secs(self.logout_timeout_secs)
    }

    pub fn cache_stale_time(&self) -> Duration {
        Duration::from_secs(self.cache_stale_secs)
    }

    /// Returns a copy with `api_url` replaced, normalizing the trailing slash.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str("api_url = \"https://discuss.example\"").unwrap();
        assert_eq!(config.api_url, "https://discuss.example");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.landing_route, "/all");
        assert!(!config.strict_selectors);
    }

    #[test]
    fn with_api_url_strips_trailing_slash() {
        let config = ClientConfig::default().with_api_url("http://api.local:8080/");
        assert_eq!(config.api_url, "http://api.local:8080");
    }
}
