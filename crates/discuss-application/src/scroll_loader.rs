//! Scroll-driven loading of the next feed page.
//!
//! The loader knows nothing about HTTP: it watches viewport geometry and asks
//! a `PageSource` for more when the user nears the bottom.

use crate::feed::{FeedEngine, FetchOutcome};
use async_trait::async_trait;
use discuss_core::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Viewport geometry of the scrolling element, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ViewportMetrics {
    pub fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    /// Within two viewport heights of the end of the content.
    pub fn is_near_bottom(&self) -> bool {
        self.scroll_height - self.scroll_top <= self.client_height * 2.0
    }
}

/// Source of viewport scroll events.
#[async_trait]
pub trait ScrollObserver: Send {
    /// Next event, or `None` once the view is gone.
    async fn next(&mut self) -> Option<ViewportMetrics>;
}

#[async_trait]
impl ScrollObserver for mpsc::Receiver<ViewportMetrics> {
    async fn next(&mut self) -> Option<ViewportMetrics> {
        self.recv().await
    }
}

/// Something that can load one more page on demand.
#[async_trait]
pub trait PageSource: Send + Sync {
    fn can_load_more(&self) -> bool;

    async fn load_next(&self) -> Result<FetchOutcome>;
}

#[async_trait]
impl PageSource for FeedEngine {
    fn can_load_more(&self) -> bool {
        let state = self.state();
        state.has_next_page && !state.is_fetching && state.error.is_none()
    }

    async fn load_next(&self) -> Result<FetchOutcome> {
        self.fetch_next_page().await
    }
}

pub struct ScrollLoader<S: PageSource> {
    source: Arc<S>,
}

impl<S: PageSource> ScrollLoader<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Handles one scroll event.
    ///
    /// # Returns
    ///
    /// `None` when the event did not trigger a load (not near the bottom,
    /// feed exhausted or already fetching).
    pub async fn on_scroll(&self, metrics: ViewportMetrics) -> Result<Option<FetchOutcome>> {
        if !metrics.is_near_bottom() || !self.source.can_load_more() {
            return Ok(None);
        }
        self.source.load_next().await.map(Some)
    }

    /// Consumes scroll events until the observer closes.
    ///
    /// Load failures are logged and do not stop the loop. Returns the number
    /// of pages appended.
    pub async fn run<O: ScrollObserver>(&self, mut observer: O) -> usize {
        let mut appended = 0;
        while let Some(metrics) = observer.next().await {
            match self.on_scroll(metrics).await {
                Ok(Some(FetchOutcome::Appended { .. })) => appended += 1,
                Ok(_) => {}
                Err(e) => tracing::warn!("[ScrollLoader] Loading the next page failed: {}", e),
            }
        }
        tracing::debug!("[ScrollLoader] Observer closed after {} page(s)", appended);
        appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        loads: AtomicUsize,
        exhausted: AtomicBool,
    }

    #[async_trait]
    impl PageSource for CountingSource {
        fn can_load_more(&self) -> bool {
            !self.exhausted.load(Ordering::SeqCst)
        }

        async fn load_next(&self) -> Result<FetchOutcome> {
            let offset = self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(FetchOutcome::Appended { offset, count: 20 })
        }
    }

    #[test]
    fn near_bottom_threshold_is_two_viewports() {
        assert!(ViewportMetrics::new(1000.0, 2000.0, 500.0).is_near_bottom());
        assert!(!ViewportMetrics::new(999.0, 2000.0, 500.0).is_near_bottom());
    }

    #[tokio::test]
    async fn only_near_bottom_events_load() {
        let source = Arc::new(CountingSource::default());
        let loader = ScrollLoader::new(source.clone());

        assert_eq!(loader.on_scroll(ViewportMetrics::new(0.0, 5000.0, 500.0)).await.unwrap(), None);
        assert!(loader.on_scroll(ViewportMetrics::new(4200.0, 5000.0, 500.0)).await.unwrap().is_some());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_source_ignores_scrolling() {
        let source = Arc::new(CountingSource::default());
        source.exhausted.store(true, Ordering::SeqCst);
        let loader = ScrollLoader::new(source.clone());

        let (tx, rx) = mpsc::channel(4);
        tx.send(ViewportMetrics::new(900.0, 1000.0, 500.0)).await.unwrap();
        drop(tx);

        assert_eq!(loader.run(rx).await, 0);
        assert_eq!(source.loads.load(Ordering::SeqCst), 0);
    }
}
