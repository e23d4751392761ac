//! Paginated feed engine.
//!
//! # Module Structure
//!
//! - `engine`: Page accumulation per feed key, filter changes, stale-result
//!   dropping, shared fetches between engines, login gating and cache
//!   write-through
//! - `retry`: Backoff policy for failed page fetches

mod engine;
mod retry;

pub use engine::{FeedEngine, FeedOptions, FetchOutcome, SkipReason};
pub use retry::RetryPolicy;
