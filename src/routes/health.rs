use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
    pub cache_enabled: bool,
}

/// Reports store reachability. Always 200 so probes can read the body.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let probe = sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await;
    let store_error = probe.err().map(|e| e.to_string());

    Json(HealthResponse {
        status: if store_error.is_none() { "ok" } else { "degraded" },
        store_ok: store_error.is_none(),
        store_error,
        cache_enabled: state.authz.cache_enabled(),
    })
}
