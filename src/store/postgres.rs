use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{CredentialRecord, CredentialStore};
use crate::config::DatabaseConfig;
use crate::error::StoreError;

pub struct PgCredentialStore {
    pool: Arc<PgPool>,
}

impl PgCredentialStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Builds the pool without connecting. Connection failures surface from
    /// `lookup` as `StoreError::Unavailable`, so the server starts while the
    /// database is down.
    pub fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self, StoreError> {
        Self::new_with_options(&config.url, config.max_connections, config.acquire_timeout())
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        info!("Credential store migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn lookup(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let record = sqlx::query_as::<_, CredentialRecord>(
            "SELECT username, password_hash, salt FROM credentials WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }
}
