//! Swipe Shield - Main Entry Point
//!
//! Provisions the model artifact, loads it once, and serves predictions over HTTP.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use swipe_shield::{
    api::{create_router, AppState},
    config::{AppConfig, LogFormat, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    ArtifactProvisioner, ModelLoader, PredictionService, Threshold,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;
    info!("Starting Swipe Shield");

    let threshold = Threshold::new(config.detection.threshold)
        .context("Invalid detection.threshold in configuration")?;
    info!(
        "Detection threshold: {:.2}, model path: {}",
        threshold.value(),
        config.model.path
    );

    // Make sure the artifact is on disk
    let artifact_path = ArtifactProvisioner::from_config(&config.model)
        .ensure_present()
        .await
        .context("Failed to provision model artifact")?;

    // Load the prediction service
    let loader = ModelLoader::from_config(&config.model);
    let service = Arc::new(
        PredictionService::load_with(&loader, &artifact_path)
            .context("Failed to load model artifact")?,
    );
    let model = service.info();
    info!(
        "Prediction service ready: {} ({}, {} schema, {} features)",
        model.name,
        model.kind,
        model.schema.as_str(),
        model.feature_count
    );

    // Initialize metrics
    let metrics = Arc::new(ServiceMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = AppState::new(service, metrics.clone(), threshold);
    let app = create_router(state, config.server.max_upload_bytes);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // Print final summary
    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("swipe_shield={},tower_http=info", logging.level))
            .context("Invalid logging.level in configuration")?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
