/// Entry point for the views server
///
/// Loads configuration from the environment and starts the HTTP server.

use project_views::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - View management API at /api/project/{project_id}/views/*
/// - Health check at /healthz
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (defaults to 0.0.0.0:3000 and data/views.db)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
