/// HTTP API Layer
///
/// This module provides the REST endpoints for project-scoped views:
/// - Context middleware resolving the user, project and view of a request
/// - View CRUD and ordering endpoints
/// - Fire-and-forget audit event recording

// Request context middleware (user, project, view)
pub mod middleware;

// View management endpoints (GET/POST/PUT/DELETE)
pub mod views;

use crate::{
    error::ApiError,
    store::{Event, EventStore, ProjectStore, SqliteStore, ViewStore},
};
use axum::extract::FromRequest;
use std::sync::Arc;

pub use views::create_view_routes;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Host-owned projects, users and memberships
    pub projects: Arc<dyn ProjectStore>,
    /// View persistence
    pub views: Arc<dyn ViewStore>,
    /// Audit log
    pub events: Arc<dyn EventStore>,
}

impl AppState {
    /// Back every port with the same SQLite store
    pub fn from_store(store: SqliteStore) -> Self {
        let store = Arc::new(store);
        Self {
            projects: store.clone(),
            views: store.clone(),
            events: store,
        }
    }
}

/// JSON body extractor whose rejections go through `ApiError`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Append an audit event without affecting the response
///
/// Failures are logged and swallowed.
pub(crate) async fn record_event(events: &dyn EventStore, event: Event) {
    let description = event.description.clone().unwrap_or_default();
    if let Err(e) = events.create_event(event).await {
        tracing::error!("Failed to record event '{}': {}", description, e);
    }
}
