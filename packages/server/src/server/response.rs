//! Response envelope shared by every JSON route.
//!
//! Success: `{"data": ...}`. Failure: `{"data": [], "error": "<message>", "code": <status>}`.
//! Internal causes are logged here and never echoed to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::common::InvalidPhoneNumber;
use crate::domains::auth::CredentialError;
use crate::domains::identity::StoreError;

#[derive(Debug, Serialize)]
struct Envelope<T> {
    data: T,
}

/// Successful response wrapped in the `data` envelope.
#[derive(Debug)]
pub struct ApiResponse<T>(pub T);

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(Envelope { data: self.0 })).into_response()
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ApiError {
    #[error("Bad request")]
    BadRequest,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Request timeout")]
    Timeout,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "data": [],
            "error": self.to_string(),
            "code": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<InvalidPhoneNumber> for ApiError {
    fn from(_: InvalidPhoneNumber) -> Self {
        ApiError::BadRequest
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidPhone => ApiError::BadRequest,
            CredentialError::Unauthenticated | CredentialError::InvalidToken => {
                info!(error = %err, "request not authorized");
                ApiError::Unauthorized
            }
            CredentialError::Gateway { .. } => {
                warn!(error = %err, "verification provider failure");
                ApiError::Internal
            }
            CredentialError::Signing(_) | CredentialError::Internal(_) => {
                error!(error = %err, "token key failure");
                ApiError::Internal
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "identity store failure");
        ApiError::Internal
    }
}
