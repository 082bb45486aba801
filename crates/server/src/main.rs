use anyhow::Result;
use naturetalk_core::config::{AppConfig, LoadOptions};
use naturetalk_server::{bootstrap, http};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use naturetalk_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        routes = app.service.route_count(),
        "naturetalk-server started"
    );

    http::serve(app).await?;
    Ok(())
}
