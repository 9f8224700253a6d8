use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::models::user_permission::{UpsertOverrideRequest, UserPermission};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id/overrides", get(list_overrides).post(upsert_override))
        .route("/users/:user_id/overrides/:override_id", delete(delete_override))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/overrides",
    tag = "Overrides",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "User overrides", body = Vec<UserPermission>))
)]
pub async fn list_overrides(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<UserPermission>>> {
    Ok(Json(state.authz.overrides.list_for_user(user_id).await?))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/overrides",
    tag = "Overrides",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = UpsertOverrideRequest,
    responses(
        (status = 200, description = "Override saved", body = UserPermission),
        (status = 400, description = "Invalid action or time restriction"),
    )
)]
pub async fn upsert_override(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpsertOverrideRequest>,
) -> AppResult<Json<UserPermission>> {
    Ok(Json(state.authz.overrides.upsert(user_id, &req).await?))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/overrides/{override_id}",
    tag = "Overrides",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("override_id" = Uuid, Path, description = "Override ID"),
    ),
    responses(
        (status = 204, description = "Override removed"),
        (status = 404, description = "Override not found"),
    )
)]
pub async fn delete_override(
    State(state): State<AppState>,
    Path((user_id, override_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state.authz.overrides.delete(user_id, override_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
