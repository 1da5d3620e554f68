//! FileRelay Server: realtime file relay between online users
//!
//! Main entry point that wires the crates together and starts the server.

use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use filerelay_api::{AppState, build_app};
use filerelay_core::config::AppConfig;
use filerelay_core::error::AppError;
use filerelay_realtime::RelayEngine;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("FILERELAY_ENV").unwrap_or_else(|_| "development".to_string());

    match std::env::var("FILERELAY_CONFIG") {
        Ok(path) => AppConfig::load_from(&path, &env),
        Err(_) => AppConfig::load(&env),
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting FileRelay v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        auth_mode = ?config.auth.mode,
        chunk_size = config.transfer.chunk_size_bytes,
        nack_undeliverable = config.realtime.nack_undeliverable,
        "Configuration loaded"
    );

    let engine = RelayEngine::new(config.realtime.clone());
    let authenticator = filerelay_auth::build_authenticator(&config.auth);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let addr = config.server.bind_address();

    let state = AppState::new(config, engine.clone(), authenticator);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("FileRelay server listening on {}", addr);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => return flatten_server_result(result),
        _ = shutdown_signal() => {}
    }

    tracing::info!("Shutdown signal received, closing relay connections...");
    if let Err(e) = engine.shutdown().await {
        tracing::warn!("Relay shutdown reported an error: {}", e);
    }
    let _ = stop_tx.send(());

    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => flatten_server_result(result)?,
        Err(_) => {
            tracing::warn!("Graceful shutdown exceeded {:?}, exiting", grace);
            server.abort();
        }
    }

    tracing::info!("FileRelay server shut down gracefully");
    Ok(())
}

fn flatten_server_result(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(AppError::internal(format!("Server error: {}", e))),
        Err(e) => Err(AppError::internal(format!("Server task failed: {}", e))),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
