//! Role management routes.
//!
//! Every write here schedules invalidation of the affected cache entries.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use uuid::Uuid;

use super::ScopeQuery;
use crate::app::AppState;
use crate::errors::AppResult;
use crate::models::permission_set::PermissionSet;
use crate::models::role::{ReplaceRolePermissionsRequest, Role, RoleCreateRequest, RolePermission};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:role_id", axum::routing::delete(delete_role))
        .route("/roles/:role_id/effective-permissions", get(effective_permissions))
        .route("/roles/:role_id/invalidate", post(invalidate_role))
        .route("/roles/:role_id/permissions", get(list_role_permissions).put(replace_role_permissions))
        .route("/roles/:role_id/legacy-permissions", put(set_legacy_permissions))
        .route("/role-names/:role_name/users", get(users_for_role))
        .route("/users/:user_id/roles", get(roles_for_user))
}

#[utoipa::path(
    get,
    path = "/roles",
    tag = "Roles",
    responses((status = 200, description = "List of roles", body = Vec<Role>))
)]
pub async fn list_roles(State(state): State<AppState>) -> AppResult<Json<Vec<Role>>> {
    Ok(Json(state.authz.roles.list_roles().await?))
}

#[utoipa::path(
    post,
    path = "/roles",
    tag = "Roles",
    request_body = RoleCreateRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "Role name already exists in scope"),
    )
)]
pub async fn create_role(
    State(state): State<AppState>,
    Json(req): Json<RoleCreateRequest>,
) -> AppResult<(StatusCode, Json<Role>)> {
    let role = state.authz.roles.create_role(&req).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    delete,
    path = "/roles/{role_id}",
    tag = "Roles",
    params(("role_id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 404, description = "Role not found"),
    )
)]
pub async fn delete_role(State(state): State<AppState>, Path(role_id): Path<Uuid>) -> AppResult<StatusCode> {
    state.authz.roles.delete_role(role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/roles/{role_id}/effective-permissions",
    tag = "Roles",
    params(("role_id" = Uuid, Path, description = "Role ID")),
    responses((status = 200, description = "Resolved permission set", body = PermissionSet))
)]
pub async fn effective_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> AppResult<Json<PermissionSet>> {
    Ok(Json(state.authz.effective_permissions(role_id).await?))
}

#[utoipa::path(
    post,
    path = "/roles/{role_id}/invalidate",
    tag = "Roles",
    params(("role_id" = Uuid, Path, description = "Role ID")),
    responses((status = 204, description = "Cached permission set dropped"))
)]
pub async fn invalidate_role(State(state): State<AppState>, Path(role_id): Path<Uuid>) -> StatusCode {
    state.authz.invalidate_role(role_id).await;
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/roles/{role_id}/permissions",
    tag = "Roles",
    params(("role_id" = Uuid, Path, description = "Role ID")),
    responses((status = 200, description = "Normalized permission rows", body = Vec<RolePermission>))
)]
pub async fn list_role_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> AppResult<Json<Vec<RolePermission>>> {
    Ok(Json(state.authz.roles.list_rows(role_id).await?))
}

#[utoipa::path(
    put,
    path = "/roles/{role_id}/permissions",
    tag = "Roles",
    params(("role_id" = Uuid, Path, description = "Role ID")),
    request_body = ReplaceRolePermissionsRequest,
    responses(
        (status = 200, description = "Rows after replacement", body = Vec<RolePermission>),
        (status = 400, description = "Unknown action or empty resource"),
        (status = 404, description = "Role not found"),
    )
)]
pub async fn replace_role_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
    Json(req): Json<ReplaceRolePermissionsRequest>,
) -> AppResult<Json<Vec<RolePermission>>> {
    let rows = state
        .authz
        .roles
        .replace_permissions(role_id, &req.permissions)
        .await?;
    Ok(Json(rows))
}

#[utoipa::path(
    put,
    path = "/roles/{role_id}/legacy-permissions",
    tag = "Roles",
    params(("role_id" = Uuid, Path, description = "Role ID")),
    request_body = PermissionSet,
    responses(
        (status = 204, description = "Legacy document stored"),
        (status = 404, description = "Role not found"),
    )
)]
pub async fn set_legacy_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
    Json(set): Json<PermissionSet>,
) -> AppResult<StatusCode> {
    state.authz.roles.set_legacy_permissions(role_id, &set).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/role-names/{role_name}/users",
    tag = "Roles",
    params(("role_name" = String, Path, description = "Role name"), ScopeQuery),
    responses(
        (status = 200, description = "User IDs holding the role", body = Vec<Uuid>),
        (status = 400, description = "Malformed scope"),
    )
)]
pub async fn users_for_role(
    State(state): State<AppState>,
    Path(role_name): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> AppResult<Json<Vec<Uuid>>> {
    let scope = query.parse()?;
    Ok(Json(state.authz.users_for_role(&role_name, scope).await?))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/roles",
    tag = "Roles",
    params(("user_id" = Uuid, Path, description = "User ID"), ScopeQuery),
    responses(
        (status = 200, description = "Role names held in scope", body = Vec<String>),
        (status = 400, description = "Malformed scope"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn roles_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ScopeQuery>,
) -> AppResult<Json<Vec<String>>> {
    let scope = query.parse()?;
    Ok(Json(state.authz.roles_for_user(user_id, scope).await?))
}
