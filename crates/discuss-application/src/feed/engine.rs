use super::retry::RetryPolicy;
use crate::query_cache::{FetchSlot, InFlightGuard, InFlightWait, QueryCache};
use discuss_core::config::ClientConfig;
use discuss_core::feed::{
    FALLBACK_FEED_PATH, FeedFilters, FeedQueryKey, FeedState, FilterChange, ResourceSelector,
};
use discuss_core::post::{Page, Post};
use discuss_core::session::Session;
use discuss_core::{DiscussError, Result};
use discuss_interaction::{ForumApi, PageQuery};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedOptions {
    pub retry: RetryPolicy,
    /// Reject selectors missing from the path table instead of falling back
    /// to the all-posts feed.
    pub strict_selectors: bool,
}

impl FeedOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            retry: RetryPolicy::default(),
            strict_selectors: config.strict_selectors,
        }
    }
}

/// Why a fetch request did not reach the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// This engine already has a fetch running.
    InFlight,
    /// The last page was short; there is nothing more.
    Exhausted,
    /// The feed waits for a login; see `sync_with_session` and `refetch`.
    LoginRequired,
    /// The state holds an error; call `retry` to clear it.
    Errored,
    /// Only the page right after the last fetched one can be requested.
    OutOfOrder { expected: usize, requested: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Appended { offset: usize, count: usize },
    Skipped(SkipReason),
    /// The key or generation changed while the request was in flight; the
    /// result was dropped.
    Stale,
    /// The feed needs an account; the state now asks for a login.
    AuthRequired,
}

/// Accumulates the pages of one feed.
///
/// The selector is fixed for the engine's lifetime; the filters move through
/// `change_filter`, each change starting a fresh state under a new key. The
/// generation counter is bumped under the state lock on every reset, so a
/// completion can tell whether the state it was started for still exists.
pub struct FeedEngine {
    api: ForumApi,
    cache: Arc<QueryCache>,
    selector: ResourceSelector,
    path: String,
    options: FeedOptions,
    state: watch::Sender<FeedState>,
    generation: AtomicU64,
}

/// Identity of one fetch, captured when it starts.
struct FetchTicket {
    key: FeedQueryKey,
    generation: u64,
    offset: usize,
    _guard: InFlightGuard,
}

/// A page another fetch with the same key is already loading.
struct SharedFetch {
    key: FeedQueryKey,
    generation: u64,
    offset: usize,
    wait: InFlightWait,
}

enum Begin {
    Fetch(FetchTicket),
    Join(SharedFetch),
    Skip(SkipReason),
}

impl FeedEngine {
    /// Opens a feed, seeding it from the cache when a fresh entry exists.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for an unknown selector when
    /// `strict_selectors` is set.
    pub async fn open(
        api: ForumApi,
        cache: Arc<QueryCache>,
        selector: ResourceSelector,
        filters: FeedFilters,
        options: FeedOptions,
    ) -> Result<Self> {
        let path = resolve_path(&selector, options.strict_selectors)?;
        let key = FeedQueryKey::new(selector.clone(), filters);

        let state = match cache.get_fresh(&key.cache_key()).await {
            Some(pages) => {
                tracing::debug!("[Feed] {} seeded with {} cached page(s)", key, pages.len());
                FeedState::with_pages(key, pages)
            }
            None => FeedState::new(key),
        };

        Ok(Self {
            api,
            cache,
            selector,
            path,
            options,
            state: watch::Sender::new(state),
            generation: AtomicU64::new(0),
        })
    }

    pub fn selector(&self) -> &ResourceSelector {
        &self.selector
    }

    /// Backend path this feed is fetched from.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn key(&self) -> FeedQueryKey {
        self.state.borrow().key.clone()
    }

    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    /// Fetches the page at `offset`, which must be the next unfetched one.
    ///
    /// When another fetch with the same key already loads this page, waits
    /// for it and takes the page from the cache. If that fetch left nothing
    /// behind, this one goes to the network itself.
    ///
    /// # Errors
    ///
    /// Returns the last transport error once retries are exhausted or the
    /// error is terminal. The error is also recorded in the state.
    pub async fn fetch_page(&self, offset: usize) -> Result<FetchOutcome> {
        loop {
            match self.begin_fetch(offset) {
                Begin::Fetch(ticket) => return self.run_fetch(ticket).await,
                Begin::Skip(reason) => {
                    tracing::debug!(
                        "[Feed] Skipping page {} of {}: {:?}",
                        offset,
                        self.path,
                        reason
                    );
                    return Ok(FetchOutcome::Skipped(reason));
                }
                Begin::Join(shared) => {
                    tracing::debug!(
                        "[Feed] Page {} of {} is already being fetched; waiting",
                        offset,
                        shared.key
                    );
                    if let Some(outcome) = self.join_fetch(shared).await {
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    async fn run_fetch(&self, ticket: FetchTicket) -> Result<FetchOutcome> {
        let offset = ticket.offset;
        let query = PageQuery::for_page(offset, ticket.key.filters());
        let mut attempt = 0;
        let result = loop {
            match self.api.fetch_posts(&self.path, &query).await {
                Ok(posts) => break Ok(posts),
                Err(e) if self.options.retry.should_retry(&e, attempt) => {
                    let delay = self.options.retry.delay_for(attempt);
                    tracing::warn!(
                        "[Feed] Page {} of {} failed ({}); retry {} in {:?}",
                        offset,
                        self.path,
                        e,
                        attempt + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    if !self.is_current(&ticket) {
                        break Err(e);
                    }
                }
                Err(e) => break Err(e),
            }
        };

        self.complete_fetch(ticket, result).await
    }

    /// Fetches the next page unless the feed is exhausted, busy, errored or
    /// waiting for a login.
    pub async fn fetch_next_page(&self) -> Result<FetchOutcome> {
        let next = {
            let state = self.state.borrow();
            if state.is_fetching {
                Err(SkipReason::InFlight)
            } else if state.auth_required {
                Err(SkipReason::LoginRequired)
            } else if state.error.is_some() {
                Err(SkipReason::Errored)
            } else if !state.has_next_page {
                Err(SkipReason::Exhausted)
            } else {
                Ok(state.next_offset())
            }
        };

        match next {
            Ok(offset) => self.fetch_page(offset).await,
            Err(reason) => Ok(FetchOutcome::Skipped(reason)),
        }
    }

    /// Clears a recorded error and fetches the next page again.
    pub async fn retry(&self) -> Result<FetchOutcome> {
        let cleared = self.state.send_if_modified(|state| {
            if state.error.is_none() || state.is_fetching {
                return false;
            }
            state.error = None;
            state.has_next_page = true;
            true
        });
        if cleared {
            tracing::info!("[Feed] Retrying {}", self.key());
        }
        self.fetch_next_page().await
    }

    /// Drops every page, along with any error or login prompt, and fetches
    /// page 0 again under the current key.
    ///
    /// This is how a live feed reacts to cached data going stale, e.g. after
    /// a login.
    pub async fn refetch(&self) -> Result<FetchOutcome> {
        let key = self.reset(false);
        tracing::info!("[Feed] Refetching {}", key);
        self.fetch_page(0).await
    }

    /// Lines the feed up with the current session.
    ///
    /// An authenticated session refetches a feed that was waiting for a
    /// login. A settled anonymous session puts a feed that needs an account
    /// into the auth-required state without touching the network. While the
    /// session is still loading nothing changes.
    ///
    /// # Returns
    ///
    /// The outcome of whatever the session change triggered, if anything.
    pub async fn sync_with_session(&self, session: &Session) -> Result<Option<FetchOutcome>> {
        if session.is_authenticated() {
            let waiting_for_login = self.state.borrow().auth_required;
            if !waiting_for_login {
                return Ok(None);
            }
            return self.refetch().await.map(Some);
        }
        if session.is_loading() || !self.selector.requires_auth() {
            return Ok(None);
        }

        let already_gated = {
            let state = self.state.borrow();
            state.auth_required && state.pages.is_empty()
        };
        if already_gated {
            return Ok(None);
        }
        let key = self.reset(true);
        tracing::info!("[Feed] {} needs a login", key);
        Ok(Some(FetchOutcome::AuthRequired))
    }

    /// Keeps the feed in line with the session for as long as the engine is
    /// alive. The current session is applied right away.
    pub fn follow_session(
        self: &Arc<Self>,
        mut sessions: watch::Receiver<Session>,
    ) -> JoinHandle<()> {
        let engine: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let session = sessions.borrow_and_update().clone();
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                if let Err(e) = engine.sync_with_session(&session).await {
                    tracing::warn!("[Feed] Reacting to session change failed: {}", e);
                }
                drop(engine);

                if sessions.changed().await.is_err() {
                    break;
                }
            }
            tracing::debug!("[Feed] Session follower stopped");
        })
    }

    /// Moves one filter dimension. Any change discards the accumulated pages
    /// and restarts pagination at offset 0.
    ///
    /// # Returns
    ///
    /// `false` when the value was already selected.
    pub fn change_filter(&self, change: FilterChange) -> bool {
        let changed = self.state.send_if_modified(|state| {
            let mut filters = state.key.filters();
            if !filters.apply(change) {
                return false;
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = FeedState::new(FeedQueryKey::new(self.selector.clone(), filters));
            true
        });

        if changed {
            tracing::info!("[Feed] Filter changed; now showing {}", self.key());
        }
        changed
    }

    fn begin_fetch(&self, offset: usize) -> Begin {
        let mut begin = Begin::Skip(SkipReason::InFlight);

        self.state.send_if_modified(|state| {
            let expected = state.next_offset();
            if state.is_fetching {
                return false;
            }
            if offset != expected {
                begin = Begin::Skip(SkipReason::OutOfOrder {
                    expected,
                    requested: offset,
                });
                return false;
            }
            if state.auth_required {
                begin = Begin::Skip(SkipReason::LoginRequired);
                return false;
            }
            if !state.has_next_page {
                begin = Begin::Skip(SkipReason::Exhausted);
                return false;
            }

            let generation = self.generation.load(Ordering::SeqCst);
            state.is_fetching = true;
            begin = match self.cache.try_begin(fetch_key(&state.key, offset)) {
                FetchSlot::Acquired(guard) => Begin::Fetch(FetchTicket {
                    key: state.key.clone(),
                    generation,
                    offset,
                    _guard: guard,
                }),
                FetchSlot::Busy(wait) => Begin::Join(SharedFetch {
                    key: state.key.clone(),
                    generation,
                    offset,
                    wait,
                }),
            };
            true
        });

        begin
    }

    /// Waits for a fetch started elsewhere and adopts its page.
    ///
    /// Returns `None` when the cache holds nothing usable afterwards; the
    /// caller then fetches on its own.
    async fn join_fetch(&self, shared: SharedFetch) -> Option<FetchOutcome> {
        let SharedFetch {
            key,
            generation,
            offset,
            wait,
        } = shared;
        wait.finished().await;
        let cached = self.cache.get_fresh(&key.cache_key()).await;

        let mut current = true;
        let mut outcome = None;
        self.state.send_if_modified(|state| {
            if state.key != key || self.generation.load(Ordering::SeqCst) != generation {
                current = false;
                return false;
            }
            state.is_fetching = false;

            if let Some(mut pages) = cached.filter(|pages| pages.len() > offset) {
                pages.truncate(offset + 1);
                if let Some(page) = pages.last() {
                    state.has_next_page = page.is_full();
                    outcome = Some(FetchOutcome::Appended {
                        offset,
                        count: page.len(),
                    });
                }
                state.pages = pages;
                state.error = None;
            }
            true
        });

        if !current {
            tracing::debug!("[Feed] Dropping shared result for page {} of {}", offset, key);
            return Some(FetchOutcome::Stale);
        }
        if outcome.is_none() {
            tracing::debug!("[Feed] Shared fetch of page {} left no page; fetching", offset);
        }
        outcome
    }

    /// Starts a fresh state under the current key. With `login_required`
    /// the state shows a login prompt and fetches nothing.
    fn reset(&self, login_required: bool) -> FeedQueryKey {
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = FeedState::new(state.key.clone());
            if login_required {
                state.auth_required = true;
                state.has_next_page = false;
            }
        });
        self.key()
    }

    async fn complete_fetch(
        &self,
        ticket: FetchTicket,
        result: Result<Vec<Post>>,
    ) -> Result<FetchOutcome> {
        let offset = ticket.offset;
        let gated = self.selector.requires_auth();
        let mut outcome: Option<Result<FetchOutcome>> = None;
        let mut cached_pages: Option<Vec<Page>> = None;

        self.state.send_if_modified(|state| {
            if state.key != ticket.key
                || self.generation.load(Ordering::SeqCst) != ticket.generation
            {
                return false;
            }
            state.is_fetching = false;

            match &result {
                Ok(posts) => {
                    let page = Page::new(offset, posts.clone());
                    let count = page.len();
                    state.has_next_page = page.is_full();
                    state.pages.push(page);
                    state.error = None;
                    cached_pages = Some(state.pages.clone());
                    outcome = Some(Ok(FetchOutcome::Appended { offset, count }));
                }
                Err(e) if e.is_unauthorized() && gated => {
                    state.auth_required = true;
                    state.has_next_page = false;
                    state.error = None;
                    outcome = Some(Ok(FetchOutcome::AuthRequired));
                }
                Err(e) => {
                    if !e.is_retryable() {
                        state.has_next_page = false;
                    }
                    state.error = Some(e.clone());
                    outcome = Some(Err(e.clone()));
                }
            }
            true
        });

        let Some(outcome) = outcome else {
            tracing::debug!(
                "[Feed] Dropping stale result for page {} of {}",
                offset,
                ticket.key
            );
            return Ok(FetchOutcome::Stale);
        };

        match &outcome {
            Ok(FetchOutcome::Appended { count, .. }) => {
                tracing::debug!("[Feed] Page {} of {}: {} post(s)", offset, ticket.key, count);
            }
            Ok(FetchOutcome::AuthRequired) => {
                tracing::info!("[Feed] {} needs a login", ticket.key);
            }
            Err(e) => tracing::error!("[Feed] Page {} of {} failed: {}", offset, ticket.key, e),
            Ok(_) => {}
        }

        if let Some(pages) = cached_pages {
            self.cache.put(ticket.key.cache_key(), pages).await;
        }
        outcome
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
            && self.state.borrow().key == ticket.key
    }
}

fn resolve_path(selector: &ResourceSelector, strict: bool) -> Result<String> {
    match selector.api_path() {
        Some(path) => Ok(path),
        None if strict => Err(DiscussError::config(format!(
            "Unknown feed selector: {selector}"
        ))),
        None => {
            tracing::warn!(
                "[Feed] Unknown selector {:?}; falling back to {}",
                selector.to_string(),
                FALLBACK_FEED_PATH
            );
            Ok(FALLBACK_FEED_PATH.to_string())
        }
    }
}

fn fetch_key(key: &FeedQueryKey, offset: usize) -> String {
    format!("{}#{}", key.cache_key(), offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use discuss_core::credential::MemoryCredentialStore;
    use discuss_core::feed::SortBy;
    use discuss_interaction::Transport;
    use discuss_interaction::mock::{ScriptedExecutor, post_list};

    async fn open(
        executor: &Arc<ScriptedExecutor>,
        selector: &str,
        strict: bool,
    ) -> Result<FeedEngine> {
        let transport = Transport::new(executor.clone(), Arc::new(MemoryCredentialStore::new()));
        FeedEngine::open(
            ForumApi::new(Arc::new(transport)),
            Arc::new(QueryCache::default()),
            ResourceSelector::parse(selector),
            FeedFilters::default(),
            FeedOptions {
                strict_selectors: strict,
                ..FeedOptions::default()
            },
        )
        .await
    }

    #[tokio::test]
    async fn unknown_selector_falls_back_or_fails_when_strict() {
        let executor = Arc::new(ScriptedExecutor::new());
        let engine = open(&executor, "trending", false).await.unwrap();
        assert_eq!(engine.path(), FALLBACK_FEED_PATH);

        let err = open(&executor, "trending", true).await.err().unwrap();
        assert!(matches!(err, DiscussError::Config(_)));
    }

    #[tokio::test]
    async fn out_of_order_offsets_are_skipped() {
        let executor = Arc::new(ScriptedExecutor::new());
        let engine = open(&executor, "all", false).await.unwrap();

        let outcome = engine.fetch_page(1).await.unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Skipped(SkipReason::OutOfOrder {
                expected: 0,
                requested: 1
            })
        );
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn not_found_is_terminal() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.push("/api/posts/user/ghost", 404, "");
        let engine = open(&executor, "user/ghost", false).await.unwrap();

        let err = engine.fetch_next_page().await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(executor.call_count("/api/posts/user/ghost"), 1);

        let state = engine.state();
        assert!(!state.has_next_page);
        assert!(!state.is_fetching);
        assert_eq!(state.error, Some(DiscussError::not_found("/api/posts/user/ghost")));
        assert_eq!(
            engine.fetch_next_page().await.unwrap(),
            FetchOutcome::Skipped(SkipReason::Errored)
        );
    }

    #[tokio::test]
    async fn retry_clears_the_error_and_fetches_again() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.push("/api/posts/thread/9", 404, "");
        executor.push_json("/api/posts/thread/9", 200, post_list(1, 3));
        let engine = open(&executor, "thread/9", false).await.unwrap();

        assert!(engine.fetch_next_page().await.is_err());
        let outcome = engine.retry().await.unwrap();

        assert_eq!(outcome, FetchOutcome::Appended { offset: 0, count: 3 });
        let state = engine.state();
        assert!(state.error.is_none());
        assert!(!state.has_next_page);
    }

    #[tokio::test]
    async fn unchanged_filter_is_a_no_op() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.push_json("/api/posts/all", 200, post_list(1, 20));
        let engine = open(&executor, "all", false).await.unwrap();
        engine.fetch_next_page().await.unwrap();

        assert!(!engine.change_filter(FilterChange::SortBy(SortBy::Top)));
        assert_eq!(engine.state().total_posts(), 20);
    }
}
