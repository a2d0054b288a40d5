use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::{CredentialRecord, CredentialStore};
use crate::auth::PasswordHasher;
use crate::error::{AppError, StoreError};

/// Credential store held entirely in memory. Records are added while the
/// store is being built and are read-only once it is shared.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCredentialStore {
    records: HashMap<String, CredentialRecord>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON array of credential records.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::InvalidSeed(format!("{}: {}", path.display(), e)))?;
        let records: Vec<CredentialRecord> = serde_json::from_str(&raw)
            .map_err(|e| StoreError::InvalidSeed(format!("{}: {}", path.display(), e)))?;

        let mut store = Self::new();
        for record in records {
            store.insert(record)?;
        }

        info!(path = %path.display(), records = store.len(), "Loaded credential seed file");
        Ok(store)
    }

    pub fn insert(&mut self, record: CredentialRecord) -> Result<(), StoreError> {
        if self.records.contains_key(&record.username) {
            return Err(StoreError::Duplicate(record.username));
        }
        self.records.insert(record.username.clone(), record);
        Ok(())
    }

    /// Hashes `password` with `hasher` and stores the result under `username`.
    pub fn provision(
        &mut self,
        username: &str,
        password: &str,
        hasher: &dyn PasswordHasher,
    ) -> Result<(), AppError> {
        let hashed = hasher.hash(password)?;
        self.insert(CredentialRecord::new(username, hashed.password_hash, hashed.salt))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.records.get(username).cloned())
    }
}
