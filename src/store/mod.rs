//! Durable credential storage.

pub mod credentials;

pub use credentials::{Credential, CredentialStore, FileCredentialStore};
