/// Authentication Routes
///
/// Thin JSON adapters over `AuthFlow`. Failures are returned as
/// `RequestError` so the body's `error_id` is the request id.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::AuthFlow;
use crate::error::RequestError;
use crate::logger::RequestId;

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// POST /api/v1/auth/token
///
/// Exchange email and password for an access/refresh token pair.
///
/// # Errors
/// - 400: Missing email or password
/// - 401: Invalid credentials (unknown email and wrong password look the same)
/// - 503: User store unavailable
pub async fn login(
    form: web::Json<LoginRequest>,
    flow: web::Data<AuthFlow>,
    request_id: RequestId,
) -> Result<HttpResponse, RequestError> {
    let tokens = flow
        .login(&form.email, &form.password)
        .await
        .map_err(|e| RequestError::new(request_id.as_str(), e))?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /api/v1/auth/register
///
/// Create a user. Returns the public profile; the password is never echoed.
///
/// # Errors
/// - 400: Validation errors (name/email, password empty or over 72 bytes)
/// - 409: Email already registered
/// - 500: Hashing failure or store query error
/// - 503: User store unavailable or timed out
pub async fn register(
    form: web::Json<RegisterRequest>,
    flow: web::Data<AuthFlow>,
    request_id: RequestId,
) -> Result<HttpResponse, RequestError> {
    let user = flow
        .register(&form.name, &form.email, &form.password)
        .await
        .map_err(|e| RequestError::new(request_id.as_str(), e))?;
    Ok(HttpResponse::Created().json(user))
}

/// POST /api/v1/auth/refresh-token
///
/// Exchange a refresh token for a new token pair.
///
/// # Errors
/// - 400: Missing refresh token
/// - 401: Invalid, expired or wrongly-signed token
/// - 404: The token's user no longer exists
/// - 503: User store unavailable
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    flow: web::Data<AuthFlow>,
    request_id: RequestId,
) -> Result<HttpResponse, RequestError> {
    let tokens = flow
        .refresh(&form.refresh_token)
        .await
        .map_err(|e| RequestError::new(request_id.as_str(), e))?;
    Ok(HttpResponse::Ok().json(tokens))
}
