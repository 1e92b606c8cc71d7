/// View management REST API endpoints
///
/// All routes live under `/api/project/{project_id}/views`. Writes respond
/// 204 and leave an audit event behind; reads respond 200 with JSON.

use crate::{
    api::{
        middleware::{project_middleware, user_middleware, view_middleware},
        record_event, AppJson, AppState,
    },
    error::{ApiError, ApiResult},
    store::{Event, EventObjectType, Project, User, View},
};
use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use std::collections::HashMap;

/// Create view management routes
///
/// Item routes get the view middleware; every route gets the project and
/// user middleware, user outermost.
pub fn create_view_routes(state: AppState) -> Router<AppState> {
    let item_routes = Router::new()
        .route(
            "/api/project/{project_id}/views/{view_id}",
            get(get_view).put(update_view).delete(remove_view),
        )
        .route_layer(from_fn_with_state(state.clone(), view_middleware));

    Router::new()
        .route("/api/project/{project_id}/views", get(get_views).post(add_view))
        .route("/api/project/{project_id}/views/positions", post(set_view_positions))
        .merge(item_routes)
        .route_layer(from_fn_with_state(state.clone(), project_middleware))
        .route_layer(from_fn_with_state(state, user_middleware))
}

/// List the project's views
///
/// GET /api/project/{project_id}/views
async fn get_views(
    State(state): State<AppState>,
    Extension(project): Extension<Project>,
) -> ApiResult<Json<Vec<View>>> {
    let views = state.views.get_views(project.id).await?;
    Ok(Json(views))
}

/// GET /api/project/{project_id}/views/{view_id}
async fn get_view(Extension(view): Extension<View>) -> Json<View> {
    Json(view)
}

/// Create a view
///
/// POST /api/project/{project_id}/views
/// Body: { "project_id": 1, "title": "...", "position": 0 }
async fn add_view(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    AppJson(view): AppJson<View>,
) -> ApiResult<StatusCode> {
    if view.project_id != project.id {
        return Err(ApiError::BadRequest(
            "Project ID in body and URL must be the same".to_string(),
        ));
    }

    let new_view = state.views.create_view(view).await?;

    tracing::info!("Created view {} ({}) in project {}", new_view.id, new_view.title, project.id);

    record_event(
        state.events.as_ref(),
        Event::new(format!("View {} created", new_view.title))
            .by_user(user.id)
            .in_project(new_view.project_id)
            .on_object(EventObjectType::View, new_view.id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Update a view
///
/// PUT /api/project/{project_id}/views/{view_id}
/// Body: { "id": 1, "project_id": 1, "title": "...", "position": 0 }
async fn update_view(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    Extension(old_view): Extension<View>,
    AppJson(view): AppJson<View>,
) -> ApiResult<StatusCode> {
    if view.project_id != project.id {
        return Err(ApiError::BadRequest(
            "Project ID in body and URL must be the same".to_string(),
        ));
    }

    if view.id != old_view.id {
        return Err(ApiError::BadRequest(
            "View ID in body and URL must be the same".to_string(),
        ));
    }

    let title = view.title.clone();
    state.views.update_view(view).await?;

    tracing::info!("Updated view {} ({}) in project {}", old_view.id, title, project.id);

    record_event(
        state.events.as_ref(),
        Event::new(format!("View {} updated", title))
            .by_user(user.id)
            .in_project(old_view.project_id)
            .on_object(EventObjectType::View, old_view.id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a view
///
/// DELETE /api/project/{project_id}/views/{view_id}
async fn remove_view(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(view): Extension<View>,
) -> ApiResult<StatusCode> {
    state.views.delete_view(view.project_id, view.id).await?;

    tracing::info!("Deleted view {} ({}) from project {}", view.id, view.title, view.project_id);

    // The view row is gone, so the event only references the project
    record_event(
        state.events.as_ref(),
        Event::new(format!("View {} deleted", view.title))
            .by_user(user.id)
            .in_project(view.project_id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Reorder views
///
/// POST /api/project/{project_id}/views/positions
/// Body: { "<view_id>": <position>, ... }
async fn set_view_positions(
    State(state): State<AppState>,
    Extension(project): Extension<Project>,
    AppJson(positions): AppJson<HashMap<i64, i64>>,
) -> ApiResult<StatusCode> {
    state.views.set_view_positions(project.id, &positions).await?;

    tracing::debug!("Reordered {} views in project {}", positions.len(), project.id);

    Ok(StatusCode::NO_CONTENT)
}
