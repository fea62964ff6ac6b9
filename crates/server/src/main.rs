//! Roadwatch server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use roadwatch_api::{app, middleware::AppState};
use roadwatch_common::{Config, LocalStorage, StorageBackend};
use roadwatch_core::{JwtIdentityProvider, ReportService};
use roadwatch_db::{SharedConnection, repositories::ReportRepository};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Form fields allowed on top of the file slots.
const FORM_FIELDS_ALLOWANCE: u64 = 1024 * 1024;

/// File slots per report: five media, one voice, one identity capture.
const FILE_SLOTS: u64 = 7;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "roadwatch=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Arc::new(Config::load()?);

    init_tracing(config.logging.json);
    info!(
        environment = ?config.server.environment,
        "Starting roadwatch server..."
    );

    // Connect to database and run migrations
    let shared = SharedConnection::new(Arc::clone(&config));
    let db = shared.ensure_connected().await?;

    // File store
    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(
        config.uploads.base_path.clone(),
        config.uploads.base_url.clone(),
    ));
    info!(path = %config.uploads.base_path.display(), "Using local file store");

    // Services
    let report_service =
        ReportService::from_config(ReportRepository::new(db), storage, &config)?;
    let identity = JwtIdentityProvider::new(&config.auth)?;

    let body_limit = config
        .uploads
        .max_file_size
        .saturating_mul(FILE_SLOTS)
        .saturating_add(FORM_FIELDS_ALLOWANCE);

    let state = AppState {
        report_service,
        identity: Arc::new(identity),
        default_locale: config.server.default_locale,
        expose_error_details: config.server.expose_error_details(),
        body_limit: usize::try_from(body_limit).unwrap_or(usize::MAX),
    };

    let router = app(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
