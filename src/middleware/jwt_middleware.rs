/// JWT Authentication Middleware
///
/// Validates the access token from the Authorization header and injects
/// its claims into request extensions for the route handlers.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::TokenVerifier;
use crate::error::{AppError, AuthError, ErrorContext, RequestError};
use crate::logger::RequestId;

/// Guard for routes that require a valid access token
pub struct JwtMiddleware {
    verifier: TokenVerifier,
}

impl JwtMiddleware {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    verifier: TokenVerifier,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string);

        let claims = match token {
            None => Err(AppError::Auth(AuthError::MissingToken)),
            Some(token) => self.verifier.verify_access(&token).map_err(AppError::from),
        };

        match claims {
            Ok(claims) => {
                tracing::debug!(user_id = %claims.id, "Access token validated");
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                })
            }
            Err(e) => {
                ErrorContext::new("access_token_check").log_error(&e);

                let request_id = RequestId::of(req.request());
                let response = RequestError::new(request_id.as_str(), e)
                    .error_response()
                    .map_into_right_body();
                let (request, _payload) = req.into_parts();
                Box::pin(async move { Ok(ServiceResponse::new(request, response)) })
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}
