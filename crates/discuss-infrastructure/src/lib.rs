//! Infrastructure layer of the Discuss client: on-disk paths, atomic file
//! storage, the file-backed credential store and configuration loading.

pub mod config_service;
pub mod file_credential_store;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::file_credential_store::FileCredentialStore;
pub use crate::paths::DiscussPaths;
