pub mod feed;
pub mod session;

use anyhow::{Context, Result};
use colored::Colorize;
use discuss_application::{QueryCache, SessionController, SessionOptions};
use discuss_core::config::ClientConfig;
use discuss_core::session::Navigator;
use discuss_infrastructure::{ConfigService, DiscussPaths, FileCredentialStore};
use discuss_interaction::{ForumApi, ReqwestExecutor, Transport};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// A terminal has no page to reload; hard navigation just tells the user
/// where the browser would have gone.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn hard_navigate(&self, route: &str) {
        eprintln!("{}", format!("-> {route}").dimmed());
    }
}

/// Everything a command needs, wired once per invocation.
pub struct AppContext {
    pub config: ClientConfig,
    pub api: ForumApi,
    pub cache: Arc<QueryCache>,
    pub session: Arc<SessionController>,
}

impl AppContext {
    pub fn build(config_dir: Option<&Path>, api_url: Option<&str>, verbose: bool) -> Result<Self> {
        let paths = DiscussPaths::new(config_dir);
        let service = ConfigService::new(&paths);
        let log_level = service
            .peek_log_level()
            .unwrap_or_else(|| ClientConfig::default().log_level);
        init_tracing(verbose, &log_level);

        let mut config = service.get_config();
        if let Some(url) = api_url {
            config = config.with_api_url(url);
        }
        tracing::debug!("[CLI] Using API at {}", config.api_url);

        let credentials =
            Arc::new(FileCredentialStore::open(&paths).context("Failed to open credential store")?);
        let executor = ReqwestExecutor::new(&config).context("Failed to set up HTTP client")?;
        let transport = Arc::new(Transport::new(Arc::new(executor), credentials.clone()));
        let api = ForumApi::new(transport);
        let cache = Arc::new(QueryCache::new(config.cache_stale_time()));

        let session = Arc::new(SessionController::new(
            api.clone(),
            credentials,
            cache.clone(),
            Arc::new(TerminalNavigator),
            SessionOptions::from_config(&config),
        ));

        Ok(Self {
            config,
            api,
            cache,
            session,
        })
    }
}

/// `RUST_LOG` wins, then `--verbose`, then the configured level.
fn init_tracing(verbose: bool, configured: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { configured };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
