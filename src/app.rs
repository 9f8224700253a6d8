use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::AuthzService;
use crate::routes::{authz, catalog, health, members, overrides, roles};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub authz: Arc<AuthzService>,
}

impl AppState {
    pub fn new(pool: SqlitePool, authz: AuthzService) -> Self {
        Self {
            pool,
            authz: Arc::new(authz),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health))
        .route("/authz/check", post(authz::check))
        .merge(roles::routes())
        .merge(overrides::routes())
        .merge(members::routes())
        .merge(catalog::routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
