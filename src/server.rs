/// Server setup and initialization
///
/// Wires together storage, application state and HTTP routes.
/// Provides the main application factory function for creating the Axum app.

use crate::{
    api::{create_view_routes, AppState},
    config::Config,
    store::SqliteStore,
};
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Build the router for an already-initialized state
///
/// Split out from `create_app` so tests can drive the routes against any store.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Project view API routes
        .merge(create_view_routes(state.clone()))
        .with_state(state)
}

/// Create the main Axum application with all routes and middleware
///
/// Opens the database, seeds defaults on first start, and builds the router.
pub async fn create_app(config: Config) -> Result<Router> {
    // Ensure data directory exists
    tracing::info!("📁 Ensuring data directory exists: {}", config.database.data_dir);
    std::fs::create_dir_all(&config.database.data_dir)
        .with_context(|| format!("Failed to create data directory '{}'", config.database.data_dir))?;

    let store = SqliteStore::open(&config.database.db_path())
        .await
        .context("Failed to open views database")?;

    bootstrap_defaults(&store).await?;

    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = build_router(AppState::from_store(store));

    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Seed an admin user and a default project into an empty database
async fn bootstrap_defaults(store: &SqliteStore) -> Result<()> {
    if store.count_users().await? > 0 {
        return Ok(());
    }

    let admin = store.create_user("admin", "Administrator", true).await?;
    let project = store.create_project("Default Project").await?;
    store.add_project_user(project.id, admin.id).await?;

    tracing::info!(
        "🏗️ Seeded admin user {} and project {} ({})",
        admin.id,
        project.id,
        project.name
    );

    Ok(())
}

/// Start the HTTP server with the given configuration
///
/// Creates the application and starts the Axum server on the configured address and port.
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting views server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
