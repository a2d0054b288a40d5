pub mod auth;
pub mod config;
pub mod error;
pub mod store;

use std::sync::Arc;
use actix_web::{web, HttpResponse};
use tracing::{info, warn};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use auth::{AuthResult, AuthService, PasswordHasher};
pub use store::{CredentialRecord, CredentialStore, InMemoryCredentialStore, PgCredentialStore};

use crate::config::StoreBackend;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Registers the public routes. Shared by the binary and the HTTP tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().error_handler(auth::handlers::form_error_handler))
        .route("/health", web::get().to(health_check))
        .route("/api/auth/login", web::post().to(auth::handlers::login));
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    pub async fn new(config: Settings) -> Result<Self> {
        let store = build_store(&config).await?;
        let hasher: Arc<dyn PasswordHasher> = Arc::from(auth::hasher_from_config(&config.auth));

        let auth_service = AuthService::new(store, hasher)?
            .with_lookup_timeout(config.auth.lookup_timeout());

        Ok(Self {
            config: Arc::new(config),
            auth_service: Arc::new(auth_service),
        })
    }
}

async fn build_store(config: &Settings) -> Result<Arc<dyn CredentialStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            let store = match &config.store.seed_file {
                Some(path) => InMemoryCredentialStore::from_json_file(path)?,
                None => InMemoryCredentialStore::new(),
            };
            if store.is_empty() {
                warn!("In-memory credential store has no records; every login will fail");
            }
            info!(records = store.len(), "Using in-memory credential store");
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres => {
            let store = PgCredentialStore::from_config(&config.database)?;
            if config.database.run_migrations {
                store.run_migrations().await?;
            }
            info!("Using Postgres credential store");
            Ok(Arc::new(store))
        }
    }
}
