/// Error Handling Module
///
/// One enum per failure domain, unified under `AppError`:
/// 1. Input validation
/// 2. User store (persistence collaborator)
/// 3. Authentication outcomes
/// 4. Token signing and verification
/// 5. Password hashing
/// 6. Configuration
///
/// `AppError` maps every kind to an HTTP status and a stable error code.
/// Infrastructure failures get a generic caller-facing message; the full
/// error goes to the log through `ErrorContext`.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for caller-supplied input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(String),
    TooLong(String, usize),
    InvalidFormat(String),
    SuspiciousContent(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} bytes)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
        }
    }
}

impl StdError for ValidationError {}

/// User store errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another record already owns this email
    DuplicateEmail,
    /// The store could not be reached (pool exhausted, connection refused)
    Unavailable(String),
    /// The store did not answer within the configured budget
    Timeout(u64),
    Query(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateEmail => write!(f, "Email already registered"),
            StoreError::Unavailable(msg) => write!(f, "User store unavailable: {}", msg),
            StoreError::Timeout(ms) => write!(f, "User store timed out after {}ms", ms),
            StoreError::Query(msg) => write!(f, "User store query error: {}", msg),
        }
    }
}

impl StdError for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            // 23505 = unique_violation
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::DuplicateEmail
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// Authentication outcomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password; deliberately indistinguishable
    InvalidCredentials,
    /// A verified refresh token names a user that no longer exists
    UserNotFound,
    MissingToken,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::UserNotFound => write!(f, "User not found"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
        }
    }
}

impl StdError for AuthError {}

/// Token signing and verification errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, malformed token or missing claims
    Invalid,
    Expired,
    /// Header declared an algorithm other than the pinned one
    WrongAlgorithm(String),
    Signing(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Invalid => write!(f, "Invalid token"),
            TokenError::Expired => write!(f, "Token has expired"),
            TokenError::WrongAlgorithm(alg) => {
                write!(f, "Unexpected signing algorithm: {}", alg)
            }
            TokenError::Signing(msg) => write!(f, "Token signing failed: {}", msg),
        }
    }
}

impl StdError for TokenError {}

/// Password hashing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// Input exceeds what bcrypt can hash without truncation
    TooLong(usize),
    Hash(String),
    MalformedHash(String),
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordError::TooLong(max) => {
                write!(f, "Password exceeds the {}-byte hashing limit", max)
            }
            PasswordError::Hash(msg) => write!(f, "Password hashing failed: {}", msg),
            PasswordError::MalformedHash(msg) => write!(f, "Stored hash is malformed: {}", msg),
        }
    }
}

impl StdError for PasswordError {}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type returned by every auth flow operation
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Store(StoreError),
    Auth(AuthError),
    Token(TokenError),
    Password(PasswordError),
    Config(ConfigError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Token(e) => write!(f, "{}", e),
            AppError::Password(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Token(err)
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Password(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response body
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Request id; matches the `x-request-id` header and the request span
    pub error_id: String,
    pub message: String,
    /// Stable code for client-side handling
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        self.describe().0
    }

    /// Status, code and caller-facing message.
    /// Infrastructure failures get a generic message; details stay in the logs.
    fn describe(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),

            AppError::Store(e) => match e {
                StoreError::DuplicateEmail => {
                    (StatusCode::CONFLICT, "DUPLICATE_EMAIL", e.to_string())
                }
                StoreError::Unavailable(_) | StoreError::Timeout(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "User store temporarily unavailable".to_string(),
                ),
                StoreError::Query(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "Internal server error".to_string(),
                ),
            },

            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", e.to_string())
                }
                AuthError::UserNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                AuthError::MissingToken => {
                    (StatusCode::UNAUTHORIZED, "MISSING_TOKEN", e.to_string())
                }
            },

            AppError::Token(e) => match e {
                TokenError::Expired => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_EXPIRED",
                    "Token has expired".to_string(),
                ),
                TokenError::Invalid | TokenError::WrongAlgorithm(_) => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_INVALID",
                    "Token not valid".to_string(),
                ),
                TokenError::Signing(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SIGNING_ERROR",
                    "Internal server error".to_string(),
                ),
            },

            AppError::Password(e) => match e {
                PasswordError::TooLong(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "HASH_ERROR",
                    "Internal server error".to_string(),
                ),
            },

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = self.describe();
        let error_response =
            ErrorResponse::new(request_id.to_string(), message, code.to_string(), status.as_u16());
        (status, error_response)
    }
}

/// An `AppError` bound to the request that produced it
///
/// The body's `error_id` is the request id, so it matches the `x-request-id`
/// header and the request span in the logs. Logging happens where the error
/// is raised (`ErrorContext`), not here.
#[derive(Debug)]
pub struct RequestError {
    pub request_id: String,
    pub error: AppError,
}

impl RequestError {
    pub fn new(request_id: impl Into<String>, error: impl Into<AppError>) -> Self {
        Self {
            request_id: request_id.into(),
            error: error.into(),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl ResponseError for RequestError {
    fn error_response(&self) -> HttpResponse {
        let (status, body) = ErrorHandler::error_response(&self.error, &self.request_id);
        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.error.status_code()
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-operation context attached to the single log line for a failure.
/// The request id comes from the enclosing request span.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub user_id: Option<String>,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            user_id: None,
            operation: operation.into(),
        }
    }

    /// Record the user once the operation has resolved one
    pub fn set_user_id(&mut self, user_id: impl ToString) {
        self.user_id = Some(user_id.to_string());
    }

    pub fn log_error(&self, error: &AppError) {
        let (status, code, _) = error.describe();
        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                user_id = ?self.user_id,
                code = code,
                error = %error,
                "Operation failed"
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                user_id = ?self.user_id,
                code = code,
                error = %error,
                "Operation rejected"
            );
        }
    }
}
