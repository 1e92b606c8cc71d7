/// Storage layer
///
/// Handlers never talk to SQL directly. They go through the port traits below,
/// which `SqliteStore` implements against a single SQLite database.

pub mod sqlite;
pub mod types;

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub use sqlite::SqliteStore;
pub use types::{Event, EventObjectType, Project, User, View};

/// Errors surfaced by every store port
#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested row does not exist (or is outside the caller's project)
    #[error("Not found")]
    NotFound,

    /// Entity failed validation before it reached the database
    #[error("{0}")]
    Validation(String),

    /// Write would break a relational constraint
    #[error("{0}")]
    InvalidOperation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Host-owned projects, users and memberships
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get_project(&self, project_id: i64) -> StoreResult<Project>;

    async fn get_user(&self, user_id: i64) -> StoreResult<User>;

    /// Whether `user_id` has a membership row in `project_id`
    async fn is_project_member(&self, project_id: i64, user_id: i64) -> StoreResult<bool>;
}

/// Views scoped to a project
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// All views of a project ordered by position, then id
    async fn get_views(&self, project_id: i64) -> StoreResult<Vec<View>>;

    async fn get_view(&self, project_id: i64, view_id: i64) -> StoreResult<View>;

    async fn create_view(&self, view: View) -> StoreResult<View>;

    async fn update_view(&self, view: View) -> StoreResult<()>;

    async fn delete_view(&self, project_id: i64, view_id: i64) -> StoreResult<()>;

    /// Apply `view_id -> position` atomically; fails with `NotFound` if any
    /// view does not belong to the project
    async fn set_view_positions(
        &self,
        project_id: i64,
        positions: &HashMap<i64, i64>,
    ) -> StoreResult<()>;
}

/// Append-only audit log
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, event: Event) -> StoreResult<Event>;

    /// Most recent first
    async fn get_events(&self, project_id: i64) -> StoreResult<Vec<Event>>;
}
