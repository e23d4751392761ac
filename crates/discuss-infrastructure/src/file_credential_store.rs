//! File-backed credential store.
//!
//! Entries live in `credentials.json` as a flat JSON object. The file is read
//! once at construction and rewritten atomically on every change. Memory only
//! takes a change once it is on disk.

use crate::paths::DiscussPaths;
use crate::storage::AtomicJsonFile;
use discuss_core::Result;
use discuss_core::credential::CredentialStore;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Entries = BTreeMap<String, String>;

pub struct FileCredentialStore {
    file: AtomicJsonFile<Entries>,
    entries: RwLock<Entries>,
}

impl FileCredentialStore {
    /// Opens the store at the default location (`<config_dir>/credentials.json`).
    pub fn open(paths: &DiscussPaths) -> Result<Self> {
        Ok(Self::with_path(paths.credentials_file()?))
    }

    /// Opens the store at a custom path.
    ///
    /// A missing file starts empty. A corrupt file also starts empty; it is
    /// overwritten by the next `set`.
    pub fn with_path(path: PathBuf) -> Self {
        let file = AtomicJsonFile::new(path).private();
        let entries = match file.load() {
            Ok(loaded) => loaded.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    "[CredentialStore] Discarding unreadable credentials at {:?}: {}",
                    file.path(),
                    e
                );
                Entries::new()
            }
        };

        Self {
            file,
            entries: RwLock::new(entries),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, name: &str) -> Option<String> {
        self.read().get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut entries = self.write();
        let mut updated = entries.clone();
        updated.insert(name.to_string(), value.to_string());
        self.file.save(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let mut entries = self.write();
        if !entries.contains_key(name) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(name);
        self.file.save(&updated)?;
        *entries = updated;
        Ok(())
    }
}
