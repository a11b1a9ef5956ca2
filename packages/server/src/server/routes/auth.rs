use axum::extract::{Extension, Query};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::{PhoneNumber, UserId};
use crate::domains::auth::TokenParser;
use crate::domains::identity::{Identity, IdentityStore, StoreError};
use crate::server::app::AppState;
use crate::server::middleware::AuthUser;
use crate::server::response::{ApiError, ApiResponse};

#[derive(Debug, Deserialize)]
pub struct AuthenticateQuery {
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    phone: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub uuid: UserId,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResponse {
    pub user_id: UserId,
}

fn required(value: Option<String>) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ApiError::BadRequest)
}

/// Existing identity for the phone, or a fresh one that is not yet stored.
async fn identity_for(store: &IdentityStore, phone: PhoneNumber) -> Result<Identity, ApiError> {
    match store.get_user(&phone).await {
        Ok(identity) => Ok(identity),
        Err(StoreError::NotFound) => Ok(Identity::new(phone)),
        Err(e) => Err(e.into()),
    }
}

/// GET /public/v1/authenticate?phone=
///
/// Triggers the verification challenge. Nothing is persisted.
pub async fn authenticate_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<AuthenticateQuery>,
) -> Result<ApiResponse<&'static str>, ApiError> {
    let phone = PhoneNumber::parse(&required(query.phone)?)?;
    let identity = identity_for(&state.store, phone).await?;

    state.authority.start_authentication(&identity).await?;
    Ok(ApiResponse("Ok"))
}

/// GET /public/v1/signIn?phone=&code=
///
/// The identity is upserted only after the token has been minted; a rejected
/// code never touches the store.
pub async fn sign_in_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<SignInQuery>,
) -> Result<ApiResponse<TokenResponse>, ApiError> {
    let phone = PhoneNumber::parse(&required(query.phone)?)?;
    let code = query.code.unwrap_or_default();
    let identity = identity_for(&state.store, phone).await?;

    let token = state.authority.sign_in(&identity, &code).await?;
    state.store.upsert_user(&identity).await?;

    info!(user_id = %identity.id, "user signed in");
    Ok(ApiResponse(TokenResponse {
        uuid: identity.id,
        token,
    }))
}

/// GET /public/v1/verify?token=
pub async fn verify_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<ApiResponse<SubjectResponse>, ApiError> {
    let token = required(query.token)?;
    let user_id = state.authority.parse_token(&token)?;
    Ok(ApiResponse(SubjectResponse { user_id }))
}

/// GET /public/v1/me (behind the access gate)
pub async fn me_handler(user: AuthUser) -> ApiResponse<SubjectResponse> {
    ApiResponse(SubjectResponse {
        user_id: user.user_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_missing_and_blank() {
        assert_eq!(required(None), Err(ApiError::BadRequest));
        assert_eq!(required(Some("  ".to_string())), Err(ApiError::BadRequest));
        assert_eq!(required(Some("+15551234".to_string())).unwrap(), "+15551234");
    }
}
