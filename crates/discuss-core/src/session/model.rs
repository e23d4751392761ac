use serde::{Deserialize, Serialize};
use strum::Display;

use crate::user::UserProfile;

/// Authentication phase of the client.
///
/// ```text
/// Unknown ──► Anonymous
///    │
///    └──► Authenticated (optimistic) ──► Verifying ──► Authenticated | Anonymous
///
/// Authenticated ──► LoggingOut ──► Anonymous
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    /// Before the synchronous startup check has run.
    #[default]
    Unknown,
    Anonymous,
    Authenticated,
    /// Profile fetch in flight.
    Verifying,
    LoggingOut,
}

/// Identity view exposed to the rest of the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub phase: SessionPhase,
    pub user: Option<UserProfile>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            phase: SessionPhase::Anonymous,
            user: None,
            token: None,
        }
    }

    /// True only when both credential halves are present. During
    /// verification a cached profile keeps the optimistic view authenticated.
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Authenticated | SessionPhase::Verifying
        ) && self.user.is_some()
            && self.token.is_some()
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Unknown | SessionPhase::Verifying | SessionPhase::LoggingOut
        )
    }
}
