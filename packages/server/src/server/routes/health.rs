use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use tracing::error;

use crate::server::app::AppState;
use crate::server::response::ApiResponse;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database: DatabaseHealth,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

/// GET /ping
pub async fn ping_handler() -> ApiResponse<&'static str> {
    ApiResponse("pong")
}

/// GET /version
pub async fn version_handler(Extension(state): Extension<AppState>) -> ApiResponse<&'static str> {
    ApiResponse(state.version)
}

/// Health check endpoint
///
/// Returns 200 OK if the identity store answers within 5s, 503 otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let db_health = match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, state.store.health_check()).await {
        Ok(Ok(())) => DatabaseHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => {
            error!(error = %e, "health check query failed");
            DatabaseHealth {
                status: "error".to_string(),
                error: Some("query failed"),
            }
        }
        Err(_) => {
            error!("health check query timed out");
            DatabaseHealth {
                status: "error".to_string(),
                error: Some("query timeout"),
            }
        }
    };

    let is_healthy = db_health.status == "ok";
    let (status_code, overall_status) = if is_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall_status.to_string(),
            database: db_health,
        }),
    )
}
