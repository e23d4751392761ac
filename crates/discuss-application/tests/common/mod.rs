#![allow(dead_code)]

use discuss_application::{FeedEngine, FeedOptions, QueryCache, SessionController, SessionOptions};
use discuss_core::credential::MemoryCredentialStore;
use discuss_core::feed::{FeedFilters, ResourceSelector};
use discuss_core::session::Navigator;
use discuss_interaction::mock::ScriptedExecutor;
use discuss_interaction::{ForumApi, Transport};
use std::sync::{Arc, Mutex};

/// Navigator that remembers every hard navigation.
#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn hard_navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

/// One client wired against a scripted backend.
pub struct Harness {
    pub executor: Arc<ScriptedExecutor>,
    pub store: Arc<MemoryCredentialStore>,
    pub cache: Arc<QueryCache>,
    pub navigator: Arc<RecordingNavigator>,
    pub api: ForumApi,
}

impl Harness {
    pub fn new() -> Self {
        let executor = Arc::new(ScriptedExecutor::new());
        let store = Arc::new(MemoryCredentialStore::new());
        let transport = Transport::new(executor.clone(), store.clone());
        Self {
            executor,
            store,
            cache: Arc::new(QueryCache::default()),
            navigator: Arc::new(RecordingNavigator::default()),
            api: ForumApi::new(Arc::new(transport)),
        }
    }

    pub fn session(&self) -> Arc<SessionController> {
        Arc::new(SessionController::new(
            self.api.clone(),
            self.store.clone(),
            self.cache.clone(),
            self.navigator.clone(),
            SessionOptions::default(),
        ))
    }

    pub async fn feed(&self, selector: &str, filters: FeedFilters) -> Arc<FeedEngine> {
        let engine = FeedEngine::open(
            self.api.clone(),
            self.cache.clone(),
            ResourceSelector::parse(selector),
            filters,
            FeedOptions::default(),
        )
        .await
        .expect("Should open feed");
        Arc::new(engine)
    }
}
