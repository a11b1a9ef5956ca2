use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::server::response::ApiError;

/// Header carrying the shared secret for `/private` routes.
pub const SERVICE_KEY_HEADER: &str = "key";

/// Shared secret for service-to-service routes, held only as its SHA-256 digest.
#[derive(Clone)]
pub struct ServiceKey {
    digest: [u8; 32],
}

impl ServiceKey {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    pub fn matches(&self, presented: &str) -> bool {
        let presented: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
        presented == self.digest
    }
}

impl std::fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ServiceKey(..)")
    }
}

/// Service key gate
///
/// Without a configured key every request is rejected.
pub async fn service_key_middleware(
    key: Option<ServiceKey>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(SERVICE_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match (key.as_ref(), presented) {
        (Some(key), Some(presented)) if key.matches(presented) => next.run(request).await,
        (None, _) => {
            warn!("Private route called but no service key is configured");
            ApiError::Unauthorized.into_response()
        }
        _ => {
            warn!("Private route called with missing or wrong service key");
            ApiError::Unauthorized.into_response()
        }
    }
}
