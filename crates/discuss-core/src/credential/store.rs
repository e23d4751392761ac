use crate::error::Result;
use crate::user::UserProfile;

/// Entry holding the opaque bearer token.
pub const TOKEN_KEY: &str = "token";

/// Entry holding the JSON-serialized `UserProfile`.
pub const USER_KEY: &str = "user";

/// Durable key/value holder that survives restarts.
///
/// Pure key/value semantics: no validation happens here. Reads never fail;
/// an unreadable entry is reported as absent.
pub trait CredentialStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    fn set(&self, name: &str, value: &str) -> Result<()>;

    fn remove(&self, name: &str) -> Result<()>;
}

/// Reads the cached profile, treating malformed data as absent.
pub fn read_profile(store: &dyn CredentialStore) -> Option<UserProfile> {
    let raw = store.get(USER_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(profile) => Some(profile),
        Err(e) => {
            tracing::warn!("[CredentialStore] Ignoring malformed cached profile: {}", e);
            None
        }
    }
}

pub fn write_profile(store: &dyn CredentialStore, profile: &UserProfile) -> Result<()> {
    let raw = serde_json::to_string(profile)?;
    store.set(USER_KEY, &raw)
}

/// Removes both entries. Both removals are attempted even if the first fails.
pub fn clear_credentials(store: &dyn CredentialStore) -> Result<()> {
    let token = store.remove(TOKEN_KEY);
    let user = store.remove(USER_KEY);
    token.and(user)
}
