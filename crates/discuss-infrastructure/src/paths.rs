//! Unified path management for discuss client files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/discuss/           # Config directory (platform specific)
//! ├── config.toml              # Client configuration
//! └── credentials.json         # Bearer token and cached profile
//! ```

use std::path::{Path, PathBuf};

const APP_DIR: &str = "discuss";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for discuss_core::DiscussError {
    fn from(err: PathError) -> Self {
        discuss_core::DiscussError::config(err.to_string())
    }
}

/// Resolves the files the client keeps on disk.
///
/// `base` overrides the platform config directory (tests, portable installs).
#[derive(Debug, Clone, Default)]
pub struct DiscussPaths {
    base: Option<PathBuf>,
}

impl DiscussPaths {
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    /// Returns the discuss configuration directory (e.g. `~/.config/discuss/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::ConfigDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the credentials file.
    ///
    /// # Security Note
    ///
    /// The file holds a bearer token in plaintext; it is created with mode
    /// 600 on Unix.
    pub fn credentials_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("credentials.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_override_is_used_verbatim() {
        let paths = DiscussPaths::new(Some(Path::new("/tmp/discuss-test")));
        assert_eq!(
            paths.config_file().unwrap(),
            PathBuf::from("/tmp/discuss-test/config.toml")
        );
        assert_eq!(
            paths.credentials_file().unwrap(),
            PathBuf::from("/tmp/discuss-test/credentials.json")
        );
    }
}
