//! Transport: the single point of outbound HTTP calls.
//!
//! Two policies apply to every call:
//! - **Request decoration**: the stored bearer token, if any, is attached.
//! - **Response interception**: 401 drops the token and broadcasts an
//!   `UnauthorizedEvent`; every non-2xx status is normalized into
//!   `DiscussError`.
//!
//! The transport never retries and knows nothing about the session
//! controller; the broadcast channel is the only coupling between the two.

use crate::executor::{HttpExecutor, HttpRequest, HttpResponse};
use discuss_core::credential::{CredentialStore, TOKEN_KEY};
use discuss_core::{DiscussError, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::broadcast;

const UNAUTHORIZED_CHANNEL_CAPACITY: usize = 16;

/// Broadcast whenever any call comes back 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedEvent {
    pub path: String,
}

pub struct Transport {
    executor: Arc<dyn HttpExecutor>,
    credentials: Arc<dyn CredentialStore>,
    unauthorized: broadcast::Sender<UnauthorizedEvent>,
}

impl Transport {
    pub fn new(executor: Arc<dyn HttpExecutor>, credentials: Arc<dyn CredentialStore>) -> Self {
        let (unauthorized, _) = broadcast::channel(UNAUTHORIZED_CHANNEL_CAPACITY);
        Self {
            executor,
            credentials,
            unauthorized,
        }
    }

    /// Subscribes to the process-wide unauthorized signal.
    pub fn subscribe_unauthorized(&self) -> broadcast::Receiver<UnauthorizedEvent> {
        self.unauthorized.subscribe()
    }

    /// Issues a GET and returns the raw body of a 2xx response.
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let request = self.decorate(path, query);
        tracing::debug!(
            "[Transport] GET {} (authenticated: {})",
            path,
            request.bearer.is_some()
        );

        let response = self.executor.execute(request).await.inspect_err(|e| {
            tracing::warn!("[Transport] GET {} did not reach the server: {}", path, e);
        })?;

        self.intercept(path, response).map(|response| response.body)
    }

    /// Issues a GET and deserializes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let body = self.get(path, query).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("[Transport] Unexpected payload from {}: {}", path, e);
            DiscussError::from(e)
        })
    }

    fn decorate(&self, path: &str, query: &[(&str, String)]) -> HttpRequest {
        HttpRequest {
            path: path.to_string(),
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
            bearer: self.credentials.get(TOKEN_KEY),
        }
    }

    fn intercept(&self, path: &str, response: HttpResponse) -> Result<HttpResponse> {
        if response.is_success() {
            tracing::debug!("[Transport] {} {}", response.status, path);
            return Ok(response);
        }

        tracing::warn!(
            "[Transport] API error [{}] {}: {}",
            response.status,
            path,
            response.body
        );

        match response.status {
            401 => {
                if let Err(e) = self.credentials.remove(TOKEN_KEY) {
                    tracing::error!("[Transport] Failed to drop rejected token: {}", e);
                }
                // No receivers simply means no session controller is listening.
                let receivers = self
                    .unauthorized
                    .send(UnauthorizedEvent {
                        path: path.to_string(),
                    })
                    .unwrap_or(0);
                tracing::info!(
                    "[Transport] Unauthorized on {}; token removed, {} listener(s) notified",
                    path,
                    receivers
                );
                Err(DiscussError::unauthorized(path))
            }
            404 => Err(DiscussError::not_found(path)),
            status => Err(DiscussError::request_failed(status, response.body)),
        }
    }
}
