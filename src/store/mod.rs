//! Credential storage
//!
//! A [`CredentialStore`] answers one question: what verification material is
//! on file for this exact username. Adapters never mutate records on the
//! authentication path.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::StoreError;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Stored identity and password verification material for one username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CredentialRecord {
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub salt: Option<String>,
}

impl CredentialRecord {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, salt: Option<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            salt,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact-match lookup. `Ok(None)` means the username is not on file;
    /// `Err` means the backing store could not answer.
    async fn lookup(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError>;
}
