/// SQLite implementation of the store ports
///
/// One database holds projects, users, memberships, views and events.
/// Schema creation is idempotent and runs when the store is opened.

use crate::store::{
    Event, EventObjectType, EventStore, Project, ProjectStore, StoreError, StoreResult, User,
    View, ViewStore,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// SQLite-backed store shared by all request handlers
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool and make sure the schema exists
    pub async fn new(pool: SqlitePool) -> StoreResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open (or create) the database file at `db_path`
    pub async fn open(db_path: &Path) -> StoreResult<Self> {
        tracing::info!("🗄️ Opening views database: {}", db_path.display());

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options).await?;

        Self::new(pool).await
    }

    /// Private in-memory database, used by tests and throwaway runs
    ///
    /// Pinned to one connection that never expires, otherwise every new
    /// connection would see an empty database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::new(pool).await
    }

    /// Create tables and indexes
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS project (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                admin BOOLEAN NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS project__user (
                project_id INTEGER NOT NULL REFERENCES project(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
                PRIMARY KEY (project_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS project__view (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL REFERENCES project(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                position INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER REFERENCES user(id) ON DELETE SET NULL,
                project_id INTEGER REFERENCES project(id) ON DELETE CASCADE,
                object_type TEXT,
                object_id INTEGER,
                description TEXT,
                created TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_view_project ON project__view(project_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_event_project ON event(project_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn create_project(&self, name: &str) -> StoreResult<Project> {
        let created = Utc::now();
        let result = sqlx::query("INSERT INTO project (name, created) VALUES (?, ?)")
            .bind(name)
            .bind(created)
            .execute(&self.pool)
            .await?;

        Ok(Project { id: result.last_insert_rowid(), name: name.to_string(), created })
    }

    pub async fn create_user(&self, username: &str, name: &str, admin: bool) -> StoreResult<User> {
        let result = sqlx::query("INSERT INTO user (username, name, admin) VALUES (?, ?, ?)")
            .bind(username)
            .bind(name)
            .bind(admin)
            .execute(&self.pool)
            .await
            .map_err(map_constraint_error)?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            name: name.to_string(),
            admin,
        })
    }

    pub async fn add_project_user(&self, project_id: i64, user_id: i64) -> StoreResult<()> {
        sqlx::query("INSERT OR IGNORE INTO project__user (project_id, user_id) VALUES (?, ?)")
            .bind(project_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_constraint_error)?;

        Ok(())
    }

    pub async fn count_users(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Turn constraint violations into `InvalidOperation`, keep the rest as-is
fn map_constraint_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_foreign_key_violation() {
            return StoreError::InvalidOperation(
                "Referenced object does not exist".to_string(),
            );
        }
        if db_error.is_unique_violation() {
            return StoreError::InvalidOperation("Object already exists".to_string());
        }
    }
    StoreError::Database(error)
}

fn event_from_row(row: &SqliteRow) -> StoreResult<Event> {
    let object_type: Option<String> = row.try_get("object_type")?;
    Ok(Event {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        project_id: row.try_get("project_id")?,
        object_type: object_type.as_deref().and_then(EventObjectType::parse),
        object_id: row.try_get("object_id")?,
        description: row.try_get("description")?,
        created: row.try_get("created")?,
    })
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn get_project(&self, project_id: i64) -> StoreResult<Project> {
        sqlx::query_as::<_, Project>("SELECT id, name, created FROM project WHERE id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn get_user(&self, user_id: i64) -> StoreResult<User> {
        sqlx::query_as::<_, User>("SELECT id, username, name, admin FROM user WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn is_project_member(&self, project_id: i64, user_id: i64) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM project__user WHERE project_id = ? AND user_id = ?")
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl ViewStore for SqliteStore {
    async fn get_views(&self, project_id: i64) -> StoreResult<Vec<View>> {
        let views = sqlx::query_as::<_, View>(
            "SELECT id, project_id, title, position FROM project__view
             WHERE project_id = ? ORDER BY position, id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(views)
    }

    async fn get_view(&self, project_id: i64, view_id: i64) -> StoreResult<View> {
        sqlx::query_as::<_, View>(
            "SELECT id, project_id, title, position FROM project__view
             WHERE project_id = ? AND id = ?",
        )
        .bind(project_id)
        .bind(view_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn create_view(&self, view: View) -> StoreResult<View> {
        view.validate()?;

        let result =
            sqlx::query("INSERT INTO project__view (project_id, title, position) VALUES (?, ?, ?)")
                .bind(view.project_id)
                .bind(&view.title)
                .bind(view.position)
                .execute(&self.pool)
                .await
                .map_err(map_constraint_error)?;

        Ok(View { id: result.last_insert_rowid(), ..view })
    }

    async fn update_view(&self, view: View) -> StoreResult<()> {
        view.validate()?;

        let result = sqlx::query(
            "UPDATE project__view SET title = ?, position = ? WHERE id = ? AND project_id = ?",
        )
        .bind(&view.title)
        .bind(view.position)
        .bind(view.id)
        .bind(view.project_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_view(&self, project_id: i64, view_id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM project__view WHERE id = ? AND project_id = ?")
            .bind(view_id)
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(map_constraint_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_view_positions(
        &self,
        project_id: i64,
        positions: &HashMap<i64, i64>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for (view_id, position) in positions {
            let result = sqlx::query(
                "UPDATE project__view SET position = ? WHERE id = ? AND project_id = ?",
            )
            .bind(*position)
            .bind(*view_id)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

            // Dropping the transaction rolls back the rows already touched
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        let result = sqlx::query(
            r#"
            INSERT INTO event (user_id, project_id, object_type, object_id, description, created)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.user_id)
        .bind(event.project_id)
        .bind(event.object_type.map(|kind| kind.as_str()))
        .bind(event.object_id)
        .bind(&event.description)
        .bind(event.created)
        .execute(&self.pool)
        .await
        .map_err(map_constraint_error)?;

        Ok(Event { id: result.last_insert_rowid(), ..event })
    }

    async fn get_events(&self, project_id: i64) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT id, user_id, project_id, object_type, object_id, description, created
             FROM event WHERE project_id = ? ORDER BY id DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }
}
