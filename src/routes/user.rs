use actix_web::{web, HttpResponse};

use crate::auth::{AccessClaims, AuthFlow};
use crate::error::RequestError;
use crate::logger::RequestId;

/// GET /api/v1/user/me
///
/// Profile of the access token's owner. Claims are injected by `JwtMiddleware`.
pub async fn get_current_user(
    claims: web::ReqData<AccessClaims>,
    flow: web::Data<AuthFlow>,
    request_id: RequestId,
) -> Result<HttpResponse, RequestError> {
    let user = flow
        .current_user(&claims)
        .await
        .map_err(|e| RequestError::new(request_id.as_str(), e))?;
    Ok(HttpResponse::Ok().json(user))
}
