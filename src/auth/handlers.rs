use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    form: web::Form<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let LoginRequest { username, password } = form.into_inner();
    debug!(username = %username, "Received login request");

    state.auth_service.verify(&username, &password).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Login successful"
    })))
}

/// Maps an unparseable login form onto the application error body.
pub fn form_error_handler(
    err: actix_web::error::UrlencodedError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    AppError::ValidationError(err.to_string()).into()
}
