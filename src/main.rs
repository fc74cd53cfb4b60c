mod api;
mod config;
mod engine;
mod error;
mod models;
mod observability;
mod pricing;
mod settlement;
mod state;
mod stations;
mod validation;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let catalog = stations::StationCatalog::load(&config.station_data_path)?;
    if catalog.is_empty() {
        return Err(error::AppError::Internal(format!(
            "station data {} contains no stations",
            config.station_data_path
        )));
    }
    tracing::info!(stations = catalog.len(), "station catalog loaded");

    let (app_state, request_rx) = state::AppState::new(
        catalog,
        config.policy.clone(),
        config.request_queue_size,
        config.event_buffer_size,
    );
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::matching::run_match_engine(
        shared_state.clone(),
        request_rx,
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
