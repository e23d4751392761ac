//! Domain layer of the Discuss client.
//!
//! Plain data types and the traits the other layers implement. Nothing in
//! this crate performs I/O.

pub mod config;
pub mod credential;
pub mod error;
pub mod feed;
pub mod post;
pub mod session;
pub mod user;

// Re-export common error type
pub use error::{DiscussError, Result};
