//! Decision endpoint.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{build_scope, AccessRequest, DecisionSource};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckRequest {
    pub user_id: Uuid,
    #[schema(example = "invoice")]
    pub resource: String,
    #[schema(example = "update")]
    pub action: String,
    pub company_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckResponse {
    pub allowed: bool,
    pub source: DecisionSource,
    pub override_present: bool,
    #[schema(example = "*")]
    pub scope: String,
}

/// Evaluate one authorization question.
///
/// A denial is a normal 200 response with `allowed: false`.
#[utoipa::path(
    post,
    path = "/authz/check",
    tag = "Authorization",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Decision", body = CheckResponse),
        (status = 404, description = "User not found"),
    )
)]
pub async fn check(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> AppResult<Json<CheckResponse>> {
    if req.resource.trim().is_empty() || req.action.trim().is_empty() {
        return Err(AppError::bad_request("resource and action are required"));
    }

    let mut request = AccessRequest::new(req.user_id, req.resource, req.action);
    request.company_id = req.company_id;

    let decision = state.authz.check(&request).await?;

    Ok(Json(CheckResponse {
        allowed: decision.allowed,
        source: decision.source,
        override_present: decision.override_present(),
        scope: build_scope(req.company_id),
    }))
}
