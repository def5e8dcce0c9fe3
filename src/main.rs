//! # Skythread
//!
//! HTTP service for composing and publishing Bluesky posts and threads.
//!
//! ## API Endpoints
//!
//! - `GET /health`: Returns service health status
//! - `GET /session`: Reports whether a session is active
//! - `POST /login`: Logs in (body credentials, stored settings or environment)
//! - `POST /logout`: Drops the session
//! - `GET /settings` / `PUT /settings`: Reads or stores the account settings
//! - `POST /thread`: Publishes `{"segments": [...]}` as a post or thread

use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use skythread::crypto::is_encryption_configured;
use skythread::{
    get_server_port, router, validate_encryption_config, AppState, FileSettingsStore,
    ServiceConfig, XrpcTransport,
};

/// Main entry point for the skythread web service.
///
/// Initializes logging, builds the XRPC transport and the settings store from
/// the environment, and serves the API until Ctrl-C.
///
/// # Example Usage
///
/// ```bash
/// # Run with default port 3000
/// cargo run
///
/// # Run on custom port with debug logging
/// PORT=8080 RUST_LOG=debug cargo run
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize the logging system
    env_logger::init();

    let config = ServiceConfig::from_env();

    if is_encryption_configured() {
        validate_encryption_config()?;
        info!("App password encryption enabled");
    } else {
        warn!("SKYTHREAD_ENCRYPTION_KEY not set - the app password will be stored unencrypted");
    }

    let transport = Arc::new(XrpcTransport::from_config(&config)?);
    let settings = Arc::new(FileSettingsStore::new(config.settings_path.clone()));
    let state = AppState::new(transport, settings, config.env_credentials());

    let app = router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let port = get_server_port();
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!("Starting skythread server on {} (PDS {})", addr, config.service);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
