use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::common::UserId;
use crate::domains::auth::TokenParser;
use crate::server::response::ApiError;

/// Subject resolved from a verified bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
}

/// Access gate middleware
///
/// Requires `Authorization: Bearer <token>`. A missing or malformed header is
/// rejected before the token is parsed. On success the subject is inserted
/// into request extensions for the handler.
pub async fn bearer_auth_middleware(
    parser: Arc<dyn TokenParser>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(request.headers().get(AUTHORIZATION)) else {
        debug!("Missing or malformed authorization header");
        return ApiError::Unauthorized.into_response();
    };

    match parser.parse_token(token) {
        Ok(user_id) => {
            debug!("Authenticated user: {}", user_id);
            request.extensions_mut().insert(AuthUser { user_id });
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// The header must split on spaces into exactly `Bearer` and a non-empty token.
pub fn extract_bearer(header: Option<&HeaderValue>) -> Option<&str> {
    let value = header?.to_str().ok()?;
    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Some(token),
        _ => None,
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}
