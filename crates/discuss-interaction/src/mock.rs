//! Scripted `HttpExecutor` for tests.
//!
//! Responses are queued per path and consumed in order. A path with an empty
//! queue falls back to its sticky response (see [`ScriptedExecutor::always`]),
//! and otherwise answers 404.

use crate::executor::{HttpExecutor, HttpRequest, HttpResponse};
use async_trait::async_trait;
use discuss_core::post::{Post, PostInfo};
use discuss_core::{DiscussError, Result};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Response(HttpResponse),
    NetworkError,
}

#[derive(Debug, Clone)]
struct Scripted {
    delay: Option<Duration>,
    reply: Reply,
}

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<String, VecDeque<Scripted>>,
    sticky: HashMap<String, Scripted>,
    requests: Vec<HttpRequest>,
}

#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    script: Mutex<Script>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, path: &str, status: u16, body: impl Into<String>) {
        self.enqueue(path, None, Self::response(status, body));
    }

    pub fn push_json(&self, path: &str, status: u16, body: Value) {
        self.push(path, status, body.to_string());
    }

    /// Queues a response that is only delivered after `delay`.
    pub fn push_delayed(&self, path: &str, delay: Duration, status: u16, body: impl Into<String>) {
        self.enqueue(path, Some(delay), Self::response(status, body));
    }

    pub fn push_network_error(&self, path: &str) {
        self.enqueue(path, None, Reply::NetworkError);
    }

    /// Answers every request to `path` with this response once its queue is empty.
    pub fn always(&self, path: &str, status: u16, body: impl Into<String>) {
        self.lock().sticky.insert(
            path.to_string(),
            Scripted {
                delay: None,
                reply: Self::response(status, body),
            },
        );
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    fn response(status: u16, body: impl Into<String>) -> Reply {
        Reply::Response(HttpResponse {
            status,
            body: body.into(),
        })
    }

    fn enqueue(&self, path: &str, delay: Option<Duration>, reply: Reply) {
        self.lock()
            .queued
            .entry(path.to_string())
            .or_default()
            .push_back(Scripted { delay, reply });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn next_reply(&self, request: &HttpRequest) -> Scripted {
        let mut script = self.lock();
        script.requests.push(request.clone());

        if let Some(scripted) = script
            .queued
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front)
        {
            return scripted;
        }

        script
            .sticky
            .get(&request.path)
            .cloned()
            .unwrap_or_else(|| Scripted {
                delay: None,
                reply: Self::response(404, "unscripted"),
            })
    }
}

#[async_trait]
impl HttpExecutor for ScriptedExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let scripted = self.next_reply(&request);

        // Always suspend once so concurrent callers interleave like real I/O.
        tokio::task::yield_now().await;
        if let Some(delay) = scripted.delay {
            tokio::time::sleep(delay).await;
        }

        match scripted.reply {
            Reply::Response(response) => Ok(response),
            Reply::NetworkError => Err(DiscussError::network(format!(
                "GET {} failed: connection refused",
                request.path
            ))),
        }
    }
}

/// JSON array of `count` posts with ids starting at `first_id`.
pub fn post_list(first_id: i64, count: usize) -> Value {
    let posts: Vec<Post> = (first_id..)
        .take(count)
        .map(|id| Post {
            post_info: PostInfo {
                id,
                title: format!("Post {id}"),
                content: Some(format!("Body of post {id}")),
                created_at: None,
                post_karma: 0,
                comments_count: 0,
            },
            thread_info: None,
            user_info: None,
            extra: Map::new(),
        })
        .collect();
    serde_json::to_value(posts).unwrap_or(Value::Array(Vec::new()))
}
