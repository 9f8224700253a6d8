use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::models::member::{AddMemberRequest, CompanyMember, CompanyMemberView};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/companies/:company_id/members", get(list_members).post(add_member))
        .route("/companies/:company_id/members/:user_id", delete(deactivate_member))
}

#[utoipa::path(
    get,
    path = "/companies/{company_id}/members",
    tag = "Members",
    params(("company_id" = Uuid, Path, description = "Company ID")),
    responses((status = 200, description = "Active members", body = Vec<CompanyMemberView>))
)]
pub async fn list_members(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> AppResult<Json<Vec<CompanyMemberView>>> {
    Ok(Json(state.authz.members.list_active(company_id).await?))
}

#[utoipa::path(
    post,
    path = "/companies/{company_id}/members",
    tag = "Members",
    params(("company_id" = Uuid, Path, description = "Company ID")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = CompanyMember),
        (status = 409, description = "User already has an active membership"),
    )
)]
pub async fn add_member(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<CompanyMember>)> {
    let member = state.authz.members.add(company_id, &req).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    delete,
    path = "/companies/{company_id}/members/{user_id}",
    tag = "Members",
    params(
        ("company_id" = Uuid, Path, description = "Company ID"),
        ("user_id" = Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 204, description = "Membership deactivated"),
        (status = 404, description = "No active membership"),
    )
)]
pub async fn deactivate_member(
    State(state): State<AppState>,
    Path((company_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state.authz.members.deactivate(company_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
