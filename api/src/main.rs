//! Entry point for the public API binary. The generation worker that
//! actually drives PDF rendering ships separately, as `queue`'s `worker`
//! binary target — see SPEC_FULL.md's two-process deployment shape.

mod auth;
mod config;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use config::Config;
use queue::PreviewSweeper;
use state::AppState;
use tokio::signal;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().expect("failed to load configuration");
    let state = AppState::new(&config).await.expect("failed to initialize application state");

    let sweeper = Arc::new(PreviewSweeper::new(
        state.engine.clone(),
        Arc::new(state.registry.clone()),
        config.max_preview_age_minutes,
    ));
    tokio::spawn(sweeper.run(Duration::from_secs(config.preview_sweep_interval_seconds)));

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .expect("failed to bind HTTP listener");
    tracing::info!(port = config.http_port, environment = %config.environment, "certificate engine API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
}
