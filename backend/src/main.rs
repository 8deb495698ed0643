//! Portal backend server.
//!
//! Serves the student portal, the tenant admin panel and the super-admin
//! surface over one path-addressed JSON store:
//! - In memory, or as one JSON file per root under `DATA_DIR`
//! - Single tenant, or one data subtree per activated license
//! - Bearer-token sessions held in RAM and swept periodically

use axum::Router;
use portal_backend::{
    build_router,
    config::{Config, StorageKind},
    handlers::super_admin,
    AppState,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Initialize structured logging
    init_tracing();

    // Load configuration
    let config = Config::from_env();
    log_startup_info(&config);

    // Open storage and local state
    let state = match AppState::from_config(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to open storage");
            return;
        }
    };

    // Seed defaults the portal expects to find
    super_admin::seed_defaults(&state.store).await;
    state.gate.seed_current().await;

    // Start background workers
    state
        .sessions
        .clone()
        .start_cleanup_task(config.cleanup_interval);

    // Build and serve the application
    let app = build_router(state);
    serve(app, &config).await;
}

/// Initialize tracing with environment-based log levels.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("portal_backend=debug,tower_http=info")),
        )
        .init();
}

/// Log startup configuration (no secrets).
fn log_startup_info(config: &Config) {
    let storage = match config.storage {
        StorageKind::Memory => "memory",
        StorageKind::File => "file",
    };
    info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        storage,
        data_dir = %config.data_dir.display(),
        tenancy = config.tenancy.label(),
        session_ttl_secs = config.session_ttl.as_secs(),
        max_upload_bytes = config.max_upload_bytes,
        "Starting portal backend"
    );
}

/// Bind to address and serve the application.
async fn serve(app: Router, config: &Config) {
    let bind_addr = format!("{}:{}", config.bind_addr, config.port);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %bind_addr, error = %e, "Failed to bind to address");
            return;
        }
    };

    info!(addr = %bind_addr, "Server listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
    }
}
