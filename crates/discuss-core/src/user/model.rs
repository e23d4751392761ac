//! UserProfile domain model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DiscussError, Result};

/// Profile of the authenticated user, as returned by `GET /api/user`.
///
/// Only `id` and `username` are interpreted by the client; everything else the
/// backend sends (avatar, karma, bio, ...) is kept verbatim in `attributes`
/// so the cached copy round-trips without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default, alias = "name")]
    pub username: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl UserProfile {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            attributes: Map::new(),
        }
    }
}

/// Payload handed to `login` by the login/register views.
///
/// The auth endpoints answer with the profile fields and the bearer token in a
/// single object; the token is split off here so it is never persisted as part
/// of the cached profile.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginPayload {
    pub token: Option<String>,
    pub profile: UserProfile,
}

impl LoginPayload {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            token: None,
            profile,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Parses a raw auth response object.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(DiscussError::Serialization {
                format: "JSON".to_string(),
                message: "login payload must be a JSON object".to_string(),
            });
        };

        let token = match fields.remove("token") {
            Some(Value::String(token)) if !token.is_empty() => Some(token),
            _ => None,
        };
        let profile: UserProfile = serde_json::from_value(Value::Object(fields))?;

        Ok(Self { token, profile })
    }
}
