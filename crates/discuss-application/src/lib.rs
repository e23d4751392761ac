//! Application layer of the Discuss client.
//!
//! Coordinates the domain types with the transport: the session controller,
//! the paginated feed engine, the shared query cache and the scroll-driven
//! loader.

pub mod feed;
pub mod query_cache;
pub mod scroll_loader;
pub mod session;

pub use feed::{FeedEngine, FeedOptions, FetchOutcome, RetryPolicy, SkipReason};
pub use query_cache::QueryCache;
pub use scroll_loader::{PageSource, ScrollLoader, ScrollObserver, ViewportMetrics};
pub use session::{SessionController, SessionOptions};
