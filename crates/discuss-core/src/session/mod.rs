//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: Authentication phase and the identity snapshot (`Session`)
//! - `navigator`: Hard-navigation surface used on logout

mod model;
mod navigator;

pub use model::{Session, SessionPhase};
pub use navigator::{Navigator, NoopNavigator};
