/// Request context middleware
///
/// Layered outermost to innermost: user, project, view. Each one loads its
/// entity and stores it in the request extensions for the next layer and the
/// handler.

use crate::{
    api::AppState,
    error::{ApiError, ApiResult},
    store::{Project, StoreError, User},
};
use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use std::collections::HashMap;

/// Header carrying the id of the user the upstream auth layer authenticated
pub const USER_ID_HEADER: &str = "x-user-id";

/// Parse an integer path parameter, 400 when absent or malformed
fn int_param(params: &HashMap<String, String>, name: &str) -> ApiResult<i64> {
    params
        .get(name)
        .and_then(|value| value.parse::<i64>().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {}", name)))
}

/// Resolve the current user from `X-User-Id`
pub async fn user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let user = match state.projects.get_user(user_id).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            tracing::warn!("Rejected request for unknown user {}", user_id);
            return Err(ApiError::Unauthorized("Authentication required".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Load the project named by `project_id` and check the user may access it
pub async fn project_middleware(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    Extension(user): Extension<User>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let project_id = int_param(&params, "project_id")?;
    let project = state.projects.get_project(project_id).await?;

    if !user.admin && !state.projects.is_project_member(project.id, user.id).await? {
        tracing::warn!("User {} is not a member of project {}", user.id, project.id);
        return Err(ApiError::Forbidden("Not a member of this project".to_string()));
    }

    request.extensions_mut().insert(project);
    Ok(next.run(request).await)
}

/// Load the view named by `view_id` within the already-resolved project
pub async fn view_middleware(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    Extension(project): Extension<Project>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let view_id = int_param(&params, "view_id")?;
    let view = state.views.get_view(project.id, view_id).await?;

    request.extensions_mut().insert(view);
    Ok(next.run(request).await)
}
