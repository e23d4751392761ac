//! Session application services.
//!
//! # Module Structure
//!
//! - `controller`: Startup check, verification, login/logout and the
//!   reaction to the transport's unauthorized signal

mod controller;

pub use controller::{SessionController, SessionOptions};
