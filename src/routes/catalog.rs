use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppState;
use crate::errors::AppResult;
use crate::models::permission::{Permission, PermissionCreateRequest};

pub fn routes() -> Router<AppState> {
    Router::new().route("/permissions", get(list_permissions).post(create_permission))
}

#[utoipa::path(
    get,
    path = "/permissions",
    tag = "Catalog",
    responses((status = 200, description = "Permission catalog", body = Vec<Permission>))
)]
pub async fn list_permissions(State(state): State<AppState>) -> AppResult<Json<Vec<Permission>>> {
    Ok(Json(state.authz.catalog.list().await?))
}

#[utoipa::path(
    post,
    path = "/permissions",
    tag = "Catalog",
    request_body = PermissionCreateRequest,
    responses(
        (status = 201, description = "Permission registered", body = Permission),
        (status = 409, description = "Permission name already exists"),
    )
)]
pub async fn create_permission(
    State(state): State<AppState>,
    Json(req): Json<PermissionCreateRequest>,
) -> AppResult<(StatusCode, Json<Permission>)> {
    let permission = state.authz.catalog.create(&req).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}
