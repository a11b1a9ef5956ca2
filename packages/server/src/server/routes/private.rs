use axum::extract::{Extension, Path};
use tracing::info;

use crate::common::UserId;
use crate::server::app::AppState;
use crate::server::response::{ApiError, ApiResponse};
use crate::server::routes::auth::TokenResponse;

/// GET /private/v1/token/:uuid (behind the service key gate)
///
/// Mints a token for an arbitrary subject without a verification round trip.
pub async fn token_handler(
    Extension(state): Extension<AppState>,
    Path(uuid): Path<String>,
) -> Result<ApiResponse<TokenResponse>, ApiError> {
    let user_id = UserId::parse(&uuid).map_err(|_| ApiError::BadRequest)?;
    let token = state.authority.issue_token(user_id)?;

    info!(user_id = %user_id, "token issued over private route");
    Ok(ApiResponse(TokenResponse {
        uuid: user_id,
        token,
    }))
}
