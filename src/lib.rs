/// Project views: saved, project-scoped views with an audit trail
///
/// This library provides the HTTP handlers, context middleware and SQLite
/// storage behind the `/api/project/{project_id}/views` endpoints.

// Core configuration and setup
pub mod config;

// HTTP error translation shared by handlers and middleware
pub mod error;

// Storage ports and the SQLite implementation
pub mod store;

// HTTP API layer - view CRUD endpoints and request context middleware
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use api::AppState;
pub use error::{ApiError, ApiResult};
pub use server::{build_router, start_server};
pub use store::{Event, EventObjectType, Project, SqliteStore, StoreError, User, View};
