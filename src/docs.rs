use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::authz::{Decision, DecisionSource};
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::authz::check,
		routes::roles::list_roles,
		routes::roles::create_role,
		routes::roles::delete_role,
		routes::roles::effective_permissions,
		routes::roles::invalidate_role,
		routes::roles::list_role_permissions,
		routes::roles::replace_role_permissions,
		routes::roles::set_legacy_permissions,
		routes::roles::users_for_role,
		routes::roles::roles_for_user,
		routes::overrides::list_overrides,
		routes::overrides::upsert_override,
		routes::overrides::delete_override,
		routes::members::list_members,
		routes::members::add_member,
		routes::members::deactivate_member,
		routes::catalog::list_permissions,
		routes::catalog::create_permission
	),
	components(
		schemas(
			routes::health::HealthResponse,
			routes::authz::CheckRequest,
			routes::authz::CheckResponse,
			Decision,
			DecisionSource,
			models::permission_set::Action,
			models::permission_set::PermissionDetail,
			models::permission_set::PermissionSet,
			models::time_restriction::TimeRestriction,
			models::role::Role,
			models::role::RoleCreateRequest,
			models::role::RolePermission,
			models::role::RolePermissionInput,
			models::role::ReplaceRolePermissionsRequest,
			models::permission::Permission,
			models::permission::PermissionCreateRequest,
			models::user_permission::UserPermission,
			models::user_permission::UpsertOverrideRequest,
			models::member::CompanyMember,
			models::member::CompanyMemberView,
			models::member::AddMemberRequest
		)
	),
	tags(
		(name = "Health", description = "Liveness"),
		(name = "Authorization", description = "Permission decisions"),
		(name = "Roles", description = "Roles, grants and cache invalidation"),
		(name = "Overrides", description = "Per-user override rules"),
		(name = "Members", description = "Company memberships"),
		(name = "Catalog", description = "Permission catalog")
	)
)]
pub struct ApiDoc;

/// OpenAPI document with a `servers` entry pointing at the local port.
pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;
	if doc.get("servers").is_none() {
		doc["servers"] = json!([{ "url": format!("http://localhost:{}", port) }]);
	}
	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"]).try_it_out_enabled(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);
	let json_route = {
		let doc_json = Arc::clone(&doc_json);
		get(move || {
			let doc_json = Arc::clone(&doc_json);
			async move { Json((*doc_json).clone()) }
		})
	};

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn document_lists_decision_endpoint() {
		let doc = serde_json::to_value(build_openapi(8000).unwrap()).unwrap();
		assert!(doc["paths"].get("/authz/check").is_some());
		assert_eq!(doc["servers"][0]["url"], "http://localhost:8000");
	}
}
