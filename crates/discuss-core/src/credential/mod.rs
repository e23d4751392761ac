//! Credential store domain module.
//!
//! The store holds exactly two logical entries: the bearer token and the
//! serialized profile of the user it belongs to. Both are written by the
//! session controller only; the transport reads the token and drops it on 401.

mod memory;
mod store;

pub use memory::MemoryCredentialStore;
pub use store::{
    CredentialStore, TOKEN_KEY, USER_KEY, clear_credentials, read_profile, write_profile,
};
