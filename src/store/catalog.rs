use sqlx::SqlitePool;
use uuid::Uuid;

use super::RolePermissionStore;
use crate::authz::roles;
use crate::cache::{keys, InvalidationQueue, PermissionCache};
use crate::db::row_parsers::permission_from_row;
use crate::errors::{AppError, AppResult};
use crate::models::permission::{Permission, PermissionCreateRequest};
use crate::models::permission_set::Action;
use crate::utils::{normalize_resource, utc_now};

/// Registry of named resources.
#[derive(Clone)]
pub struct PermissionCatalog {
    pool: SqlitePool,
    cache: PermissionCache,
    invalidator: InvalidationQueue,
    roles: RolePermissionStore,
}

impl PermissionCatalog {
    pub fn new(
        pool: SqlitePool,
        cache: PermissionCache,
        invalidator: InvalidationQueue,
        roles: RolePermissionStore,
    ) -> Self {
        Self {
            pool,
            cache,
            invalidator,
            roles,
        }
    }

    /// Full catalog snapshot, read through the catalog cache.
    pub async fn list(&self) -> AppResult<Vec<Permission>> {
        if let Some(entries) = self.cache.get_json::<Vec<Permission>>(keys::CATALOG).await {
            return Ok(entries);
        }

        let rows = sqlx::query(
            "SELECT id, name, display_name, description, is_active, created_at, updated_at FROM permissions ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        let entries = rows.iter().map(permission_from_row).collect::<AppResult<Vec<_>>>()?;

        self.cache
            .set_json(keys::CATALOG, &entries, self.cache.ttls().catalog)
            .await;
        Ok(entries)
    }

    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        let name = normalize_resource(name);
        Ok(self.list().await?.into_iter().find(|p| p.name == name))
    }

    /// Registers a resource. With `seed_defaults`, the global `admin` role
    /// gets full CRUD on it and the global `user` role gets read.
    pub async fn create(&self, req: &PermissionCreateRequest) -> AppResult<Permission> {
        let name = normalize_resource(&req.name);
        if name.is_empty() {
            return Err(AppError::bad_request("permission name must not be empty"));
        }

        let existing: Option<String> = sqlx::query_scalar("SELECT id FROM permissions WHERE name = ?")
            .bind(&name)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::conflict(format!("permission {} already exists", name)));
        }

        let id = Uuid::new_v4();
        let now = utc_now();
        sqlx::query(
            "INSERT INTO permissions (id, name, display_name, description, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&name)
        .bind(&req.display_name)
        .bind(&req.description)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.invalidator.invalidate_catalog();

        if req.seed_defaults {
            self.seed_defaults(&name).await?;
        }

        tracing::info!(permission = %name, "permission registered");

        Ok(Permission {
            id,
            name,
            display_name: req.display_name.clone(),
            description: req.description.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    async fn seed_defaults(&self, resource: &str) -> AppResult<()> {
        let seeds: [(&str, &[Action]); 2] = [
            (roles::ADMIN, &Action::ALL),
            (roles::USER, &[Action::Read]),
        ];

        for (role_name, actions) in seeds {
            for role in self.roles.find_global_roles_by_name(role_name).await? {
                self.roles.grant(role.id, resource, actions).await?;
                tracing::debug!(role = %role_name, resource = %resource, "seeded default grants");
            }
        }
        Ok(())
    }

    pub async fn set_active(&self, name: &str, is_active: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE permissions SET is_active = ?, updated_at = ? WHERE name = ?")
            .bind(is_active)
            .bind(utc_now().to_rfc3339())
            .bind(normalize_resource(name))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Permission not found"));
        }

        self.invalidator.invalidate_catalog();
        Ok(())
    }
}
