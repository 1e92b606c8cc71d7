/// Entity definitions shared by the store and the HTTP layer
///
/// Projects and users belong to the host application; views and events are
/// the records this service reads and writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// A project that owns views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub created: DateTime<Utc>,
}

/// An authenticated user acting on a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    /// Admins can reach every project without a membership row
    pub admin: bool,
}

/// A saved, named query/filter scoped to a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct View {
    #[serde(default)]
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    /// Display order within the project's view list
    #[serde(default)]
    pub position: i64,
}

impl View {
    /// Check the fields the store requires before writing
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.title.trim().is_empty() {
            return Err(StoreError::Validation("View title must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Kind of object an audit event points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventObjectType {
    Project,
    User,
    View,
}

impl EventObjectType {
    /// Stable storage value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::User => "user",
            Self::View => "view",
        }
    }

    /// Parse a stored value back, `None` for kinds this service does not know
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "project" => Some(Self::Project),
            "user" => Some(Self::User),
            "view" => Some(Self::View),
            _ => None,
        }
    }
}

/// Audit-log entry recording a create/update/delete action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: i64,
    pub user_id: Option<i64>,
    pub project_id: Option<i64>,
    pub object_type: Option<EventObjectType>,
    pub object_id: Option<i64>,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
}

impl Event {
    /// Start an event for `description` stamped with the current time
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id: None,
            project_id: None,
            object_type: None,
            object_id: None,
            description: Some(description.into()),
            created: Utc::now(),
        }
    }

    pub fn by_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn in_project(mut self, project_id: i64) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn on_object(mut self, object_type: EventObjectType, object_id: i64) -> Self {
        self.object_type = Some(object_type);
        self.object_id = Some(object_id);
        self
    }
}
