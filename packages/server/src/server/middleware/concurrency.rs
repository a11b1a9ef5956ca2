use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Semaphore;
use tracing::error;

use crate::server::response::ApiError;

/// Global in-flight request cap
///
/// One semaphore is shared by every route. Waiting for a permit happens inside
/// the request future, so an enclosing timeout also bounds time spent queued.
pub async fn concurrency_limit_middleware(
    permits: Arc<Semaphore>,
    request: Request,
    next: Next,
) -> Response {
    let Ok(_permit) = permits.acquire().await else {
        error!("Request semaphore closed");
        return ApiError::Internal.into_response();
    };

    next.run(request).await
}
