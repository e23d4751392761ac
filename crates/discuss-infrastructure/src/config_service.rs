//! Configuration service implementation.
//!
//! Loads `ClientConfig` from `config.toml` and applies the environment
//! override for the API base URL.

use crate::paths::DiscussPaths;
use discuss_core::Result;
use discuss_core::config::{API_URL_ENV, ClientConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Configuration service that loads and caches the client configuration.
///
/// Resolution order for the API URL: `DISCUSS_API_URL` > `api_url` in the
/// file > built-in default. A missing file is created with defaults.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<ClientConfig>>>,
}

impl ConfigService {
    pub fn new(paths: &DiscussPaths) -> Self {
        let path = match paths.config_file() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("[ConfigService] {}; using built-in defaults", e);
                None
            }
        };
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// Load failures are logged and fall back to defaults; the client must
    /// start even with a broken config file.
    pub fn get_config(&self) -> ClientConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(|p| p.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = self.load().unwrap_or_else(|e| {
            tracing::warn!("[ConfigService] Failed to load config: {}; using defaults", e);
            Self::apply_env(ClientConfig::default(), std::env::var(API_URL_ENV).ok())
        });

        let mut write_lock = self.config.write().unwrap_or_else(|p| p.into_inner());
        *write_lock = Some(loaded.clone());
        loaded
    }

    /// Log level from the file, read without creating, caching or logging
    /// anything. Lets the caller set up logging before `get_config` reports
    /// on the file.
    pub fn peek_log_level(&self) -> Option<String> {
        let content = fs::read_to_string(self.path.as_ref()?).ok()?;
        toml::from_str::<ClientConfig>(&content)
            .ok()
            .map(|config| config.log_level)
    }

    /// Reads the file (creating it with defaults if missing) and applies the
    /// environment override.
    pub fn load(&self) -> Result<ClientConfig> {
        let file_config = match &self.path {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            Some(path) => {
                let defaults = ClientConfig::default();
                if let Err(e) = Self::write_defaults(path, &defaults) {
                    tracing::debug!("[ConfigService] Could not create {:?}: {}", path, e);
                }
                defaults
            }
            None => ClientConfig::default(),
        };

        Ok(Self::apply_env(file_config, std::env::var(API_URL_ENV).ok()))
    }

    fn write_defaults(path: &Path, defaults: &ClientConfig) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(defaults)?)?;
        tracing::info!("[ConfigService] Created default config at {:?}", path);
        Ok(())
    }

    fn apply_env(config: ClientConfig, api_url: Option<String>) -> ClientConfig {
        let url = api_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| config.api_url.clone());
        config.with_api_url(url)
    }
}
