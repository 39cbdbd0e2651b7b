//! Bridge Condition Predictor - Main Entry Point
//!
//! Loads the model once, then serves the assessment form until shut down.

use anyhow::{Context, Result};
use bridge_assessment::{
    config::AppConfig,
    handler::FormHandler,
    logging,
    metrics::{MetricsReporter, PredictionMetrics},
    models::ModelState,
    server::{self, AppState},
};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Bridge Condition Predictor
#[derive(Parser, Debug)]
#[command(name = "bridge-assessment")]
#[command(author, version, about = "Web form that predicts bridge condition from a pre-trained model", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = "config/config.toml")]
    config: String,

    /// Bind address (overrides server.bind)
    #[arg(short, long)]
    bind: Option<String>,

    /// Listen port (overrides server.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Model file (overrides model.path)
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load_from_path(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(model) = cli.model {
        config.model.path = model;
    }

    logging::init(&config.logging);

    info!("Starting Bridge Condition Predictor");
    info!(
        model = %config.model.path,
        encoding = config.model.encoding.as_str(),
        show_probabilities = config.display.show_probabilities,
        "Configuration loaded"
    );

    // Load failures are reported on the page, not fatal
    let model = ModelState::load(&config.model);

    let metrics = Arc::new(PredictionMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let handler = FormHandler::from_config(&config, model, metrics.clone());
    let app = server::router(AppState::new(handler));

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .context("Invalid server.bind / server.port")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    info!("Server shutting down...");
    metrics.print_summary();

    Ok(())
}
