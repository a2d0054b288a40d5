use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

/// Body returned for every failed login, whatever the underlying cause.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Hash error: {0}")]
    HashError(#[from] HashError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Every authentication failure renders the same payload so callers
        // cannot tell an unknown user from a wrong password.
        if let AppError::AuthError(_) = self {
            return HttpResponse::build(status).json(json!({ "error": INVALID_CREDENTIALS }));
        }

        let response = json!({
            "error": {
                "status": status.as_u16(),
                "message": self.to_string()
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::StoreError(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::StoreError(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Why a credential check failed. Callers only ever see "invalid credentials";
/// the variants exist for logging and tests.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unknown username")]
    NotFound,

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Password does not match")]
    Mismatch,
}

impl AuthError {
    /// Whether operators should hear about this failure.
    pub fn is_infrastructure_fault(&self) -> bool {
        matches!(self, AuthError::StoreUnavailable(_))
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate username: {0}")]
    Duplicate(String),

    #[error("Invalid seed data: {0}")]
    InvalidSeed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum HashError {
    #[error("Password hashing failed: {0}")]
    Failed(String),
}
