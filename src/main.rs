//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Initializes the database (and the demo clients when enabled)
//! - Starts the HTTP server with graceful shutdown support

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use mbl::config::Config;
use mbl::database::{init_db, seed_demo_clientes, AppState};
use mbl::route::create_app;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mbl=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();

    let db = init_db(&config.database_url).expect("Failed to initialize database");

    if config.seed_demo {
        match seed_demo_clientes(&db) {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "seeded demo clients"),
            Err(err) => tracing::warn!(error = %err, "could not seed demo clients"),
        }
    }

    if config.auth_token.is_none() {
        tracing::warn!("AUTHORIZATION is not set, API requests are not authenticated");
    }

    let state = AppState::new(db).with_auth_token(config.auth_token.clone());

    let app = create_app(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!(port = config.port, database = %config.database_url, "🎰 MBL server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Handles graceful shutdown signals
///
/// Returns when SIGINT (Ctrl+C) or, on Unix, SIGTERM is received so open
/// connections finish and the database closes cleanly.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("🛑 Shutdown signal received, stopping server");
}
