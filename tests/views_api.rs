//! View endpoint integration tests
//!
//! Drives the full router (middleware included) against an in-memory SQLite
//! store and checks status codes, persisted views and audit events.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use project_views::{
    build_router,
    store::{EventStore, StoreResult, ViewStore},
    AppState, Event, EventObjectType, Project, SqliteStore, StoreError, User, View,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// ============================================================================
// Test Infrastructure
// ============================================================================

struct Fixture {
    store: SqliteStore,
    project: Project,
    other_project: Project,
    admin: User,
    member: User,
    outsider: User,
}

async fn fixture() -> Fixture {
    let store = SqliteStore::in_memory().await.unwrap();
    let project = store.create_project("Infrastructure").await.unwrap();
    let other_project = store.create_project("Marketing").await.unwrap();

    let admin = store.create_user("admin", "Admin", true).await.unwrap();
    let member = store.create_user("dev", "Developer", false).await.unwrap();
    let outsider = store.create_user("guest", "Guest", false).await.unwrap();
    store.add_project_user(project.id, member.id).await.unwrap();

    Fixture { store, project, other_project, admin, member, outsider }
}

impl Fixture {
    fn app(&self) -> Router {
        build_router(AppState::from_store(self.store.clone()))
    }

    async fn view(&self, project_id: i64, title: &str) -> View {
        self.store
            .create_view(View { id: 0, project_id, title: title.to_string(), position: 0 })
            .await
            .unwrap()
    }
}

/// Event store whose writes always fail
struct BrokenEventStore;

#[async_trait]
impl EventStore for BrokenEventStore {
    async fn create_event(&self, _event: Event) -> StoreResult<Event> {
        Err(StoreError::InvalidOperation("event log unavailable".to_string()))
    }

    async fn get_events(&self, _project_id: i64) -> StoreResult<Vec<Event>> {
        Ok(Vec::new())
    }
}

/// Helper to make HTTP requests to the test app
async fn make_request(
    app: Router,
    method: &str,
    path: &str,
    body: Option<Value>,
    user: Option<&User>,
) -> (StatusCode, Value) {
    let mut req_builder = Request::builder()
        .uri(path)
        .method(method)
        .header("Content-Type", "application/json");

    if let Some(user) = user {
        req_builder = req_builder.header("X-User-Id", user.id.to_string());
    }

    let body = match body {
        Some(v) => Body::from(serde_json::to_string(&v).unwrap()),
        None => Body::empty(),
    };

    let request = req_builder.body(body).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = serde_json::from_slice(&body_bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).to_string()));

    (status, json)
}

// ============================================================================
// Context middleware
// ============================================================================

#[tokio::test]
async fn health_check_needs_no_identity() {
    let f = fixture().await;
    let (status, body) = make_request(f.app(), "GET", "/healthz", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn missing_or_unknown_user_is_unauthorized() {
    let f = fixture().await;
    let path = format!("/api/project/{}/views", f.project.id);

    let (status, _) = make_request(f.app(), "GET", &path, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let ghost = User { id: 999, username: "ghost".into(), name: "Ghost".into(), admin: false };
    let (status, _) = make_request(f.app(), "GET", &path, None, Some(&ghost)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_member_is_forbidden_but_admin_is_not() {
    let f = fixture().await;
    let path = format!("/api/project/{}/views", f.project.id);

    let (status, _) = make_request(f.app(), "GET", &path, None, Some(&f.outsider)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = make_request(f.app(), "GET", &path, None, Some(&f.admin)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_path_parameters_are_bad_requests() {
    let f = fixture().await;

    let (status, body) =
        make_request(f.app(), "GET", "/api/project/abc/views", None, Some(&f.admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid project_id" }));

    let path = format!("/api/project/{}/views/abc", f.project.id);
    let (status, body) = make_request(f.app(), "GET", &path, None, Some(&f.member)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid view_id" }));
}

#[tokio::test]
async fn unknown_project_is_not_found() {
    let f = fixture().await;
    let (status, _) =
        make_request(f.app(), "GET", "/api/project/404/views", None, Some(&f.admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn list_returns_only_the_projects_views() {
    let f = fixture().await;
    f.view(f.project.id, "Failed runs").await;
    f.view(f.project.id, "Deploys").await;
    f.view(f.other_project.id, "Campaigns").await;

    let path = format!("/api/project/{}/views", f.project.id);
    let (status, body) = make_request(f.app(), "GET", &path, None, Some(&f.member)).await;

    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Failed runs", "Deploys"]);
}

#[tokio::test]
async fn get_single_view() {
    let f = fixture().await;
    let view = f.view(f.project.id, "Deploys").await;

    let path = format!("/api/project/{}/views/{}", f.project.id, view.id);
    let (status, body) = make_request(f.app(), "GET", &path, None, Some(&f.member)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_value::<View>(body).unwrap(), view);
}

#[tokio::test]
async fn view_from_another_project_is_not_found() {
    let f = fixture().await;
    let foreign = f.view(f.other_project.id, "Campaigns").await;

    let path = format!("/api/project/{}/views/{}", f.project.id, foreign.id);
    for method in ["GET", "PUT", "DELETE"] {
        let body = json!({ "id": foreign.id, "project_id": f.project.id, "title": "Stolen" });
        let (status, _) = make_request(f.app(), method, &path, Some(body), Some(&f.admin)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
    }

    let still_there = f.store.get_view(f.other_project.id, foreign.id).await.unwrap();
    assert_eq!(still_there.title, "Campaigns");
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn create_view_stores_it_and_records_event() {
    let f = fixture().await;
    let path = format!("/api/project/{}/views", f.project.id);
    let body = json!({ "project_id": f.project.id, "title": "Nightly" });

    let (status, _) = make_request(f.app(), "POST", &path, Some(body), Some(&f.member)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let views = f.store.get_views(f.project.id).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].title, "Nightly");

    let events = f.store.get_events(f.project.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].description.as_deref(), Some("View Nightly created"));
    assert_eq!(events[0].user_id, Some(f.member.id));
    assert_eq!(events[0].object_type, Some(EventObjectType::View));
    assert_eq!(events[0].object_id, Some(views[0].id));
}

#[tokio::test]
async fn create_with_mismatched_project_is_rejected() {
    let f = fixture().await;
    let path = format!("/api/project/{}/views", f.project.id);
    let body = json!({ "project_id": f.other_project.id, "title": "Sneaky" });

    let (status, body) = make_request(f.app(), "POST", &path, Some(body), Some(&f.admin)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Project ID in body and URL must be the same" }));
    assert!(f.store.get_views(f.other_project.id).await.unwrap().is_empty());
    assert!(f.store.get_events(f.project.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_with_unreadable_body_is_rejected() {
    let f = fixture().await;
    let path = format!("/api/project/{}/views", f.project.id);

    let (status, _) =
        make_request(f.app(), "POST", &path, Some(json!({ "title": 5 })), Some(&f.admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = make_request(f.app(), "POST", &path, None, Some(&f.admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_with_blank_title_is_rejected() {
    let f = fixture().await;
    let path = format!("/api/project/{}/views", f.project.id);
    let body = json!({ "project_id": f.project.id, "title": "  " });

    let (status, _) = make_request(f.app(), "POST", &path, Some(body), Some(&f.admin)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(f.store.get_views(f.project.id).await.unwrap().is_empty());
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn update_view_records_event() {
    let f = fixture().await;
    let view = f.view(f.project.id, "Draft").await;
    let path = format!("/api/project/{}/views/{}", f.project.id, view.id);
    let body = json!({ "id": view.id, "project_id": f.project.id, "title": "Final", "position": 3 });

    let (status, _) = make_request(f.app(), "PUT", &path, Some(body), Some(&f.member)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let updated = f.store.get_view(f.project.id, view.id).await.unwrap();
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.position, 3);

    let events = f.store.get_events(f.project.id).await.unwrap();
    assert_eq!(events[0].description.as_deref(), Some("View Final updated"));
    assert_eq!(events[0].object_id, Some(view.id));
}

#[tokio::test]
async fn update_with_mismatched_ids_is_rejected() {
    let f = fixture().await;
    let view = f.view(f.project.id, "Draft").await;
    let other = f.view(f.project.id, "Other").await;
    let path = format!("/api/project/{}/views/{}", f.project.id, view.id);

    let body = json!({ "id": view.id, "project_id": f.other_project.id, "title": "Moved" });
    let (status, body) = make_request(f.app(), "PUT", &path, Some(body), Some(&f.admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Project ID in body and URL must be the same" }));

    let body = json!({ "id": other.id, "project_id": f.project.id, "title": "Hijack" });
    let (status, body) = make_request(f.app(), "PUT", &path, Some(body), Some(&f.admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "View ID in body and URL must be the same" }));

    assert_eq!(f.store.get_view(f.project.id, other.id).await.unwrap().title, "Other");
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn delete_view_records_event_without_object() {
    let f = fixture().await;
    let view = f.view(f.project.id, "Old").await;
    let path = format!("/api/project/{}/views/{}", f.project.id, view.id);

    let (status, _) = make_request(f.app(), "DELETE", &path, None, Some(&f.member)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(matches!(
        f.store.get_view(f.project.id, view.id).await,
        Err(StoreError::NotFound)
    ));

    let events = f.store.get_events(f.project.id).await.unwrap();
    assert_eq!(events[0].description.as_deref(), Some("View Old deleted"));
    assert_eq!(events[0].user_id, Some(f.member.id));
    assert_eq!(events[0].object_id, None);

    let (status, _) = make_request(f.app(), "DELETE", &path, None, Some(&f.member)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Audit failures
// ============================================================================

#[tokio::test]
async fn failing_event_log_does_not_change_responses() {
    let f = fixture().await;
    let state = AppState {
        events: Arc::new(BrokenEventStore),
        ..AppState::from_store(f.store.clone())
    };
    let app = build_router(state);

    let path = format!("/api/project/{}/views", f.project.id);
    let body = json!({ "project_id": f.project.id, "title": "Nightly" });
    let (status, _) = make_request(app.clone(), "POST", &path, Some(body), Some(&f.admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let view = f.store.get_views(f.project.id).await.unwrap().remove(0);
    let path = format!("/api/project/{}/views/{}", f.project.id, view.id);

    let body = json!({ "id": view.id, "project_id": f.project.id, "title": "Weekly" });
    let (status, _) = make_request(app.clone(), "PUT", &path, Some(body), Some(&f.admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = make_request(app, "DELETE", &path, None, Some(&f.admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(f.store.get_events(f.project.id).await.unwrap().is_empty());
}

// ============================================================================
// Positions
// ============================================================================

#[tokio::test]
async fn reorder_views() {
    let f = fixture().await;
    let a = f.view(f.project.id, "A").await;
    let b = f.view(f.project.id, "B").await;
    let path = format!("/api/project/{}/views/positions", f.project.id);

    let body = json!({ (a.id.to_string()): 1, (b.id.to_string()): 0 });
    let (status, _) = make_request(f.app(), "POST", &path, Some(body), Some(&f.member)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let titles: Vec<String> = f
        .store
        .get_views(f.project.id)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.title)
        .collect();
    assert_eq!(titles, vec!["B", "A"]);
}

#[tokio::test]
async fn reorder_with_foreign_view_changes_nothing() {
    let f = fixture().await;
    let a = f.view(f.project.id, "A").await;
    let foreign = f.view(f.other_project.id, "Foreign").await;
    let path = format!("/api/project/{}/views/positions", f.project.id);

    let body = json!({ (a.id.to_string()): 7, (foreign.id.to_string()): 8 });
    let (status, _) = make_request(f.app(), "POST", &path, Some(body), Some(&f.admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(f.store.get_view(f.project.id, a.id).await.unwrap().position, 0);
    assert_eq!(f.store.get_view(f.other_project.id, foreign.id).await.unwrap().position, 0);
}
