//! Feed domain module.
//!
//! # Module Structure
//!
//! - `selector`: Logical feed names (`ResourceSelector`) and their backend paths
//! - `filter`: Sort order and time window filters
//! - `key`: `FeedQueryKey`, the identity of one logical feed instance
//! - `state`: `FeedState`, the accumulated pages of a feed

mod filter;
mod key;
mod selector;
mod state;

pub use filter::{FeedFilters, FilterChange, SortBy, TimeWindow};
pub use key::FeedQueryKey;
pub use selector::{FALLBACK_FEED_PATH, ResourceSelector};
pub use state::FeedState;
