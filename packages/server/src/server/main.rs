// Main entry point for API server

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::Request, ServiceExt};
use auth_core::domains::auth::{CredentialAuthority, SigningKeys, TokenSigner};
use auth_core::domains::identity::IdentityStore;
use auth_core::kernel::{PgIdentityBackend, TwilioGateway};
use auth_core::server::middleware::ServiceKey;
use auth_core::server::{build_app, AppState};
use auth_core::Config;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twilio::{TwilioOptions, TwilioService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,auth_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting authorization service");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Signing keys are fatal: never serve without them
    let keys = SigningKeys::from_encoded(&config.signing_key)
        .context("Failed to load SIGNING_KEY")?;
    let signer = TokenSigner::new(keys, config.token_issuer.clone(), config.token_ttl());

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let twilio = Arc::new(TwilioService::new(TwilioOptions {
        account_sid: config.twilio_account_sid.clone(),
        auth_token: config.twilio_auth_token.clone(),
        service_id: config.twilio_verify_service_sid.clone(),
    }));
    let gateway = Arc::new(TwilioGateway::new(twilio, config.test_identifier_enabled));
    if config.test_identifier_enabled {
        tracing::warn!("Test identifiers enabled: +1555555xxxx numbers bypass Twilio");
    }

    let authority = Arc::new(CredentialAuthority::new(gateway, signer));
    let store = Arc::new(IdentityStore::new(Arc::new(PgIdentityBackend::new(pool))));

    let service_key = config.private_api_key.as_deref().map(ServiceKey::new);
    if service_key.is_none() {
        tracing::warn!("PRIVATE_API_KEY not set: all /private routes will be rejected");
    }

    // Build application
    let app = build_app(
        AppState::new(authority, store),
        service_key,
        config.request_timeout(),
    );

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
