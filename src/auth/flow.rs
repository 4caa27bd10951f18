/// Auth flow: login, register, refresh
///
/// Each call is independent. The only shared state is read-only (signing
/// key, hasher cost) plus the user store handle. Store calls are bounded by
/// a timeout; bcrypt runs on the blocking pool.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::auth::claims::AccessClaims;
use crate::auth::clock::Clock;
use crate::auth::jwt::{TokenIssuer, TokenPair, TokenVerifier};
use crate::auth::password::PasswordHasher;
use crate::configuration::{AuthSettings, JwtSettings};
use crate::domain::{NewUser, PublicUser, UserRecord};
use crate::error::{AppError, AuthError, ErrorContext, StoreError, ValidationError};
use crate::store::UserStore;
use crate::validators::{is_valid_email, is_valid_name, is_valid_password, require};

#[derive(Clone)]
pub struct AuthFlow {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    store_timeout: Duration,
}

impl AuthFlow {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        issuer: TokenIssuer,
        verifier: TokenVerifier,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            issuer,
            verifier,
            store_timeout,
        }
    }

    /// Wire the flow from configuration; any error here is fatal at startup
    pub fn from_settings(
        store: Arc<dyn UserStore>,
        jwt: &JwtSettings,
        auth: &AuthSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let hasher = PasswordHasher::new(auth.bcrypt_cost)?;
        let issuer = TokenIssuer::new(jwt, clock.clone())?;
        let verifier = TokenVerifier::new(jwt, clock)?;
        Ok(Self::new(store, hasher, issuer, verifier, auth.store_timeout()))
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Exchange an email/password pair for a token pair.
    ///
    /// Unknown email and wrong password both fail with
    /// `AuthError::InvalidCredentials` and cost one bcrypt verification.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let mut context = ErrorContext::new("user_login");
        let result = self.login_inner(email, password, &mut context).await;
        if let Err(e) = &result {
            context.log_error(e);
        }
        result
    }

    async fn login_inner(
        &self,
        email: &str,
        password: &str,
        context: &mut ErrorContext,
    ) -> Result<TokenPair, AppError> {
        let email = require("email", email)?;
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password".to_string()).into());
        }

        let user = match self.find_user(email).await? {
            Some(user) => user,
            None => {
                let hasher = self.hasher.clone();
                let candidate = password.to_string();
                run_blocking(move || hasher.verify_dummy(&candidate)).await?;
                tracing::debug!("Login for unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
        };
        context.set_user_id(user.id);

        let hasher = self.hasher.clone();
        let candidate = password.to_string();
        let stored_hash = user.password_hash.clone();
        let matches = run_blocking(move || hasher.verify(&candidate, &stored_hash)).await??;
        if !matches {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self.issuer.issue(&user)?;

        tracing::info!(user_id = %user.id, "User logged in successfully");
        Ok(tokens)
    }

    /// Create a user and return its public profile. The password is never echoed.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, AppError> {
        let context = ErrorContext::new("user_registration");
        let result = self.register_inner(name, email, password).await;
        if let Err(e) = &result {
            context.log_error(e);
        }
        result
    }

    async fn register_inner(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, AppError> {
        let name = is_valid_name(name)?;
        let email = is_valid_email(email)?;
        is_valid_password(password)?;

        let hasher = self.hasher.clone();
        let plaintext = password.to_string();
        let password_hash = run_blocking(move || hasher.hash(&plaintext)).await??;

        let new_user = NewUser {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
        };
        let created = self.bounded(self.store.create(new_user)).await?;

        tracing::info!(user_id = %created.id, "User registered successfully");
        Ok(created.to_public())
    }

    /// Exchange a valid refresh token for a new token pair.
    ///
    /// The presented token stays valid until its own expiry.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let mut context = ErrorContext::new("token_refresh");
        let result = self.refresh_inner(refresh_token, &mut context).await;
        if let Err(e) = &result {
            context.log_error(e);
        }
        result
    }

    async fn refresh_inner(
        &self,
        refresh_token: &str,
        context: &mut ErrorContext,
    ) -> Result<TokenPair, AppError> {
        let refresh_token = require("refresh_token", refresh_token)?;
        let claims = self.verifier.verify_refresh(refresh_token)?;

        let user = self
            .find_user(&claims.email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        context.set_user_id(user.id);

        let tokens = self.issuer.issue(&user)?;

        tracing::info!(user_id = %user.id, "Token refreshed successfully");
        Ok(tokens)
    }

    /// Current profile of the access token's owner
    pub async fn current_user(&self, claims: &AccessClaims) -> Result<PublicUser, AppError> {
        let mut context = ErrorContext::new("current_user");
        context.set_user_id(claims.id);

        let result = match self.find_user(&claims.email).await {
            Ok(Some(user)) => Ok(user.to_public()),
            Ok(None) => Err(AuthError::UserNotFound.into()),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            context.log_error(e);
        }
        result
    }

    async fn find_user(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.bounded(self.store.find_by_email(email)).await
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.store_timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout.as_millis() as u64))?
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))
}
