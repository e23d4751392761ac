use discuss_core::post::Page;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::time::Instant;

/// Default time a cached feed stays fresh.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
struct CacheEntry {
    pages: Vec<Page>,
    updated_at: Instant,
    invalidated: bool,
}

/// Process-wide cache of fetched feed pages, keyed by feed cache key.
///
/// Besides the page lists it owns the in-flight registry that keeps two
/// engines with the same key from fetching the same page concurrently. A
/// fetch that finds its page busy waits for the holder and then reads the
/// result from the cache.
/// Session transitions reach it through `invalidate_all` (login) and `clear`
/// (logout).
#[derive(Debug)]
pub struct QueryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    in_flight: Arc<Mutex<InFlightRegistry>>,
    stale_time: Duration,
}

impl QueryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            stale_time,
        }
    }

    /// Returns the cached pages for `key` if they are still fresh.
    ///
    /// Entries older than the stale time, or invalidated since they were
    /// written, are treated as absent but kept until overwritten.
    pub async fn get_fresh(&self, key: &str) -> Option<Vec<Page>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.invalidated && entry.updated_at.elapsed() < self.stale_time)
            .map(|entry| entry.pages.clone())
    }

    /// Stores the full page list for `key`, replacing any previous entry.
    pub async fn put(&self, key: impl Into<String>, pages: Vec<Page>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            CacheEntry {
                pages,
                updated_at: Instant::now(),
                invalidated: false,
            },
        );
    }

    /// Marks every entry whose key starts with `prefix` as stale.
    ///
    /// # Returns
    ///
    /// The number of entries affected.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().await;
        let mut count = 0;
        for (_, entry) in entries.iter_mut().filter(|(key, _)| key.starts_with(prefix)) {
            entry.invalidated = true;
            count += 1;
        }
        tracing::debug!("[QueryCache] Invalidated {} entr(ies) under {:?}", count, prefix);
        count
    }

    /// Marks every entry as stale.
    pub async fn invalidate_all(&self) -> usize {
        self.invalidate_prefix("").await
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        tracing::debug!("[QueryCache] Cleared {} entr(ies)", count);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Registers a fetch identified by `fetch_key`.
    ///
    /// When the same fetch is already in flight, returns a handle that
    /// resolves once the holder releases its registration.
    pub fn try_begin(&self, fetch_key: impl Into<String>) -> FetchSlot {
        let fetch_key = fetch_key.into();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(done) = in_flight.get(&fetch_key) {
            return FetchSlot::Busy(InFlightWait { done: done.clone() });
        }

        let (tx, rx) = watch::channel(());
        in_flight.insert(fetch_key.clone(), rx);
        FetchSlot::Acquired(InFlightGuard {
            registry: self.in_flight.clone(),
            fetch_key,
            _done: tx,
        })
    }

    pub fn is_in_flight(&self, fetch_key: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains_key(fetch_key)
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIME)
    }
}

/// Fetch key to the completion signal of the fetch holding it.
type InFlightRegistry = HashMap<String, watch::Receiver<()>>;

/// Result of `QueryCache::try_begin`.
#[derive(Debug)]
pub enum FetchSlot {
    Acquired(InFlightGuard),
    Busy(InFlightWait),
}

/// Registration of one in-flight fetch in the `QueryCache`.
///
/// Dropping it removes the registration and then closes the completion
/// channel, waking every `InFlightWait`.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<Mutex<InFlightRegistry>>,
    fetch_key: String,
    _done: watch::Sender<()>,
}

impl InFlightGuard {
    pub fn fetch_key(&self) -> &str {
        &self.fetch_key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.registry.lock().unwrap_or_else(|p| p.into_inner());
        in_flight.remove(&self.fetch_key);
    }
}

/// Handle on a fetch someone else is running.
#[derive(Debug)]
pub struct InFlightWait {
    done: watch::Receiver<()>,
}

impl InFlightWait {
    /// Resolves when the holder's guard is dropped, whatever its outcome.
    pub async fn finished(mut self) {
        while self.done.changed().await.is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Vec<Page> {
        vec![Page::new(0, Vec::new())]
    }

    #[tokio::test(start_paused = true)]
    async fn entries_go_stale_after_stale_time() {
        let cache = QueryCache::new(Duration::from_secs(120));
        cache.put("posts:all:top:alltime", page()).await;
        assert!(cache.get_fresh("posts:all:top:alltime").await.is_some());

        tokio::time::advance(Duration::from_secs(121)).await;
        assert!(cache.get_fresh("posts:all:top:alltime").await.is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn invalidate_prefix_only_touches_matching_keys() {
        let cache = QueryCache::default();
        cache.put("posts:saved:top:alltime", page()).await;
        cache.put("posts:all:top:alltime", page()).await;

        assert_eq!(cache.invalidate_prefix("posts:saved").await, 1);
        assert!(cache.get_fresh("posts:saved:top:alltime").await.is_none());
        assert!(cache.get_fresh("posts:all:top:alltime").await.is_some());

        cache.put("posts:saved:top:alltime", page()).await;
        assert!(cache.get_fresh("posts:saved:top:alltime").await.is_some());
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let cache = QueryCache::default();
        cache.put("a", page()).await;
        cache.put("b", page()).await;
        assert_eq!(cache.invalidate_all().await, 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[test]
    fn in_flight_registration_is_exclusive_until_dropped() {
        let cache = QueryCache::default();
        let FetchSlot::Acquired(guard) = cache.try_begin("posts:all:top:alltime#0") else {
            panic!("first registration should succeed");
        };
        assert!(matches!(
            cache.try_begin("posts:all:top:alltime#0"),
            FetchSlot::Busy(_)
        ));
        assert!(matches!(
            cache.try_begin("posts:all:top:alltime#1"),
            FetchSlot::Acquired(_)
        ));
        assert!(cache.is_in_flight(guard.fetch_key()));

        drop(guard);
        assert!(!cache.is_in_flight("posts:all:top:alltime#0"));
        assert!(matches!(
            cache.try_begin("posts:all:top:alltime#0"),
            FetchSlot::Acquired(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_wake_when_the_holder_finishes() {
        let cache = QueryCache::default();
        let FetchSlot::Acquired(guard) = cache.try_begin("posts:all:top:alltime#0") else {
            panic!("first registration should succeed");
        };
        let FetchSlot::Busy(wait) = cache.try_begin("posts:all:top:alltime#0") else {
            panic!("second registration should be busy");
        };

        let waiter = tokio::spawn(wait.finished());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.expect("waiter should finish once the guard is dropped");
        assert!(!cache.is_in_flight("posts:all:top:alltime#0"));
    }
}
