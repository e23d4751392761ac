//! User domain module.
//!
//! # Module Structure
//!
//! - `model`: User profile and login payload

mod model;

pub use model::{LoginPayload, UserProfile};
