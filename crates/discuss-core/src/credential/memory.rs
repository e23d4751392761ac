use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::store::CredentialStore;
use crate::error::Result;

/// In-process credential store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave a half-written map.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, name: &str) -> Option<String> {
        self.entries().get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        self.entries().insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.entries().remove(name);
        Ok(())
    }
}
