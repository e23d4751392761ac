//! Wire-level HTTP execution.
//!
//! `HttpExecutor` is the seam between the transport policies and the actual
//! network. Implementations only move bytes; status interpretation happens in
//! `Transport`.

use async_trait::async_trait;
use discuss_core::config::ClientConfig;
use discuss_core::{DiscussError, Result};
use reqwest::Client;

/// An outbound GET request relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Bearer credential attached by request decoration.
    pub bearer: Option<String>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            bearer: None,
        }
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response: any status, including errors, is a successful execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Sends the request. Fails only with `Network` when no response arrived.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Executor backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestExecutor {
    client: Client,
    base_url: String,
}

impl ReqwestExecutor {
    /// Builds a client with the configured request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DiscussError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self.client.get(&url).query(&request.query);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|err| {
            let kind = if err.is_timeout() { "timed out" } else { "failed" };
            DiscussError::network(format!("GET {} {kind}: {err}", request.path))
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| {
            DiscussError::network(format!("Failed to read body of GET {}: {err}", request.path))
        })?;

        Ok(HttpResponse { status, body })
    }
}
