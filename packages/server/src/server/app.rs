//! Application setup and server configuration.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderName, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    BoxError, Router,
};
use tokio::sync::Semaphore;
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::{Layer, ServiceBuilder};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::domains::auth::{CredentialAuthority, TokenParser};
use crate::domains::identity::IdentityStore;
use crate::server::middleware::{
    bearer_auth_middleware, concurrency_limit_middleware, service_key_middleware, ServiceKey,
    SERVICE_KEY_HEADER,
};
use crate::server::response::ApiError;
use crate::server::routes::{
    authenticate_handler, health_handler, me_handler, ping_handler, sign_in_handler,
    token_handler, verify_handler, version_handler,
};

/// Requests served concurrently across all routes before callers queue.
pub const MAX_CONCURRENT_REQUESTS: usize = 100;

/// Router with trailing slashes stripped before routing.
pub type App = NormalizePath<Router>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<CredentialAuthority>,
    pub store: Arc<IdentityStore>,
    pub version: &'static str,
}

impl AppState {
    pub fn new(authority: Arc<CredentialAuthority>, store: Arc<IdentityStore>) -> Self {
        Self {
            authority,
            store,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

async fn not_found() -> (StatusCode, &'static str) {
    (
        StatusCode::NOT_FOUND,
        "Route not found. See the API documentation for /public/v1 and /private/v1 routes.",
    )
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        warn!("Request exceeded deadline");
        ApiError::Timeout
    } else {
        error!(error = %err, "Unhandled middleware error");
        ApiError::Internal
    }
}

fn handle_panic(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("Handler panicked");
    ApiError::Internal.into_response()
}

/// Build the Axum application router
///
/// `/public/v1/me` sits behind the bearer access gate; everything under
/// `/private/v1` sits behind the service key gate.
pub fn build_app(state: AppState, service_key: Option<ServiceKey>, request_timeout: Duration) -> App {
    let parser: Arc<dyn TokenParser> = state.authority.clone();
    let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS));

    let public = Router::new()
        .route("/authenticate", get(authenticate_handler))
        .route("/signIn", get(sign_in_handler))
        .route("/verify", get(verify_handler))
        .route(
            "/me",
            get(me_handler).route_layer(middleware::from_fn(move |req, next| {
                bearer_auth_middleware(parser.clone(), req, next)
            })),
        );

    let private = Router::new()
        .route("/token/:uuid", get(token_handler))
        .route_layer(middleware::from_fn(move |req, next| {
            service_key_middleware(service_key.clone(), req, next)
        }));

    // CORS configuration - allow any origin
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET])
        .allow_headers([AUTHORIZATION, HeaderName::from_static(SERVICE_KEY_HEADER)]);

    let router = Router::new()
        .nest("/public/v1", public)
        .nest("/private/v1", private)
        .route("/ping", get(ping_handler))
        .route("/version", get(version_handler))
        .route("/health", get(health_handler))
        .fallback(not_found)
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(middleware::from_fn(move |req, next| {
            concurrency_limit_middleware(permits.clone(), req, next)
        }))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CatchPanicLayer::custom(handle_panic));

    // Path normalization must run before routing, so it wraps the router itself
    NormalizePathLayer::trim_trailing_slash().layer(router)
}
