use console_core::observability::{init_tracing, MetricsRegistry};
use dotenvy::dotenv;
use orchestrator_console::config::get_configuration;
use orchestrator_console::services::{BackendClient, ConsoleMetrics};
use orchestrator_console::startup::build_router;
use orchestrator_console::AppState;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "orchestrator-console",
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    )?;

    let registry = MetricsRegistry::new()?;
    let console_metrics = ConsoleMetrics::register(&registry)?;

    let backend = Arc::new(BackendClient::new(
        configuration.backend.clone(),
        console_metrics.clone(),
    )?);
    info!(backend = %backend.base_url(), "Using ERP backend");

    let state = AppState::new(backend, registry, console_metrics);
    let app = build_router(state, &configuration.session);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting orchestrator-console on {}", address);
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
