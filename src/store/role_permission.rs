//! Role lookups and permission-set resolution.
//!
//! A role's grants live either in normalized `role_permissions` rows or in
//! the legacy JSON document on `roles.permissions`. Rows win outright when
//! any exist; the two are never merged.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cache::{keys, InvalidationQueue, PermissionCache};
use crate::db::row_parsers::{db_role_from_row, role_permission_from_row};
use crate::errors::{AppError, AppResult};
use crate::models::permission_set::{Action, ActionPattern, PermissionSet};
use crate::models::role::{DbRole, Role, RoleCreateRequest, RolePermission, RolePermissionInput};
use crate::utils::{normalize_resource, utc_now};

pub const EFFECT_ALLOW: &str = "allow";

/// Where a role's effective permissions come from.
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionSource {
    Normalized(Vec<RolePermission>),
    Legacy(String),
    Empty,
}

pub fn fold_rows(rows: &[RolePermission]) -> PermissionSet {
    let mut set = PermissionSet::default();
    for row in rows {
        if !row.effect.eq_ignore_ascii_case(EFFECT_ALLOW) {
            continue;
        }
        match ActionPattern::parse(&row.action) {
            Some(pattern) => set.grant(&row.resource, pattern),
            None => tracing::debug!(
                role_id = %row.role_id,
                action = %row.action,
                "ignoring role permission row with unknown action"
            ),
        }
    }
    set
}

pub fn parse_legacy(raw: &str) -> Option<PermissionSet> {
    match serde_json::from_str::<PermissionSet>(raw) {
        Ok(set) => Some(set),
        Err(err) => {
            tracing::warn!(error = %err, "malformed legacy permission document");
            None
        }
    }
}

#[derive(Clone)]
pub struct RolePermissionStore {
    pool: SqlitePool,
    cache: PermissionCache,
    invalidator: InvalidationQueue,
}

impl RolePermissionStore {
    pub fn new(pool: SqlitePool, cache: PermissionCache, invalidator: InvalidationQueue) -> Self {
        Self {
            pool,
            cache,
            invalidator,
        }
    }

    pub async fn find_role(&self, role_id: Uuid) -> AppResult<Option<DbRole>> {
        let row = sqlx::query(
            "SELECT id, name, display_name, company_id, is_active, permissions, created_at, updated_at FROM roles WHERE id = ?",
        )
        .bind(role_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(db_role_from_row).transpose()
    }

    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query(
            "SELECT id, name, display_name, company_id, is_active, permissions, created_at, updated_at FROM roles ORDER BY name, created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| db_role_from_row(row).map(Role::from))
            .collect()
    }

    /// Global roles with the given name.
    pub async fn find_global_roles_by_name(&self, name: &str) -> AppResult<Vec<DbRole>> {
        let rows = sqlx::query(
            "SELECT id, name, display_name, company_id, is_active, permissions, created_at, updated_at FROM roles WHERE name = ? AND company_id IS NULL ORDER BY created_at",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(db_role_from_row).collect()
    }

    pub async fn list_rows(&self, role_id: Uuid) -> AppResult<Vec<RolePermission>> {
        let rows = sqlx::query(
            "SELECT id, role_id, resource, action, effect, priority, created_at FROM role_permissions WHERE role_id = ? ORDER BY priority DESC, resource, action",
        )
        .bind(role_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(role_permission_from_row).collect()
    }

    pub async fn load_source(&self, role_id: Uuid) -> AppResult<PermissionSource> {
        let rows = self.list_rows(role_id).await?;
        if !rows.is_empty() {
            return Ok(PermissionSource::Normalized(rows));
        }

        let legacy: Option<Option<String>> =
            sqlx::query_scalar("SELECT permissions FROM roles WHERE id = ?")
                .bind(role_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        match legacy.flatten() {
            Some(raw) if !raw.trim().is_empty() => Ok(PermissionSource::Legacy(raw)),
            _ => Ok(PermissionSource::Empty),
        }
    }

    /// Read-through resolution of a role's permission set.
    pub async fn effective_permissions(&self, role_id: Uuid) -> AppResult<PermissionSet> {
        let key = keys::role_permissions(role_id);
        if let Some(set) = self.cache.get_json::<PermissionSet>(&key).await {
            tracing::trace!(role_id = %role_id, "role permissions cache hit");
            return Ok(set);
        }

        let ttl = self.cache.ttls().role_permissions;
        match self.load_source(role_id).await? {
            PermissionSource::Normalized(rows) => {
                let set = fold_rows(&rows);
                self.cache.set_json(&key, &set, ttl).await;
                Ok(set)
            }
            PermissionSource::Legacy(raw) => match parse_legacy(&raw) {
                Some(set) => {
                    // Cache the stored bytes as-is so legacy documents round-trip untouched.
                    self.cache.set(&key, raw.into_bytes(), ttl).await;
                    Ok(set)
                }
                None => {
                    tracing::warn!(role_id = %role_id, "legacy permissions unreadable, granting nothing");
                    Ok(PermissionSet::default())
                }
            },
            PermissionSource::Empty => Ok(PermissionSet::default()),
        }
    }

    /// Removes the cached set for `role_id` and waits for the delete.
    pub async fn invalidate(&self, role_id: Uuid) {
        self.cache.delete(&keys::role_permissions(role_id)).await;
    }

    pub async fn create_role(&self, req: &RoleCreateRequest) -> AppResult<Role> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("role name must not be empty"));
        }

        let company = req.company_id.map(|c| c.to_string());
        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM roles WHERE name = ? AND company_id IS ?")
                .bind(name)
                .bind(&company)
                .fetch_optional(&self.pool)
                .await?;
        if existing.is_some() {
            return Err(AppError::conflict(format!("role {} already exists in this scope", name)));
        }

        let id = Uuid::new_v4();
        let now = utc_now();
        sqlx::query(
            "INSERT INTO roles (id, name, display_name, company_id, is_active, permissions, created_at, updated_at) VALUES (?, ?, ?, ?, 1, NULL, ?, ?)",
        )
        .bind(id.to_string())
        .bind(name)
        .bind(&req.display_name)
        .bind(&company)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::info!(role_id = %id, name = %name, "role created");

        Ok(Role {
            id,
            name: name.to_string(),
            display_name: req.display_name.clone(),
            company_id: req.company_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn set_active(&self, role_id: Uuid, is_active: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE roles SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(is_active)
            .bind(utc_now().to_rfc3339())
            .bind(role_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Role not found"));
        }

        self.invalidator.invalidate_role(role_id);
        for company_id in self.companies_using(role_id).await? {
            self.invalidator.invalidate_company_members(company_id);
        }
        Ok(())
    }

    /// Companies with a membership row pointing at `role_id`.
    async fn companies_using(&self, role_id: Uuid) -> AppResult<Vec<Uuid>> {
        let companies: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT company_id FROM company_members WHERE role_id = ?")
                .bind(role_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        companies
            .iter()
            .map(|c| Uuid::parse_str(c).map_err(|e| AppError::internal(format!("invalid uuid: {}", e))))
            .collect()
    }

    /// Replaces every normalized row of a role. An empty list hands the role
    /// back to its legacy document.
    pub async fn replace_permissions(
        &self,
        role_id: Uuid,
        inputs: &[RolePermissionInput],
    ) -> AppResult<Vec<RolePermission>> {
        let mut normalized = Vec::with_capacity(inputs.len());
        for input in inputs {
            let resource = normalize_resource(&input.resource);
            if resource.is_empty() {
                return Err(AppError::bad_request("resource must not be empty"));
            }
            let pattern = ActionPattern::parse(&input.action).ok_or_else(|| {
                AppError::bad_request(format!("unknown action: {}", input.action))
            })?;
            normalized.push((resource, pattern, input.priority));
        }

        if self.find_role(role_id).await?.is_none() {
            return Err(AppError::not_found("Role not found"));
        }

        let now = utc_now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
            .bind(role_id.to_string())
            .execute(&mut *tx)
            .await?;

        for (resource, pattern, priority) in &normalized {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (id, role_id, resource, action, effect, priority, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (role_id, resource, action) DO UPDATE SET priority = excluded.priority
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(role_id.to_string())
            .bind(resource)
            .bind(pattern.as_str())
            .bind(EFFECT_ALLOW)
            .bind(priority)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE roles SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(role_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.invalidator.invalidate_role(role_id);

        tracing::info!(role_id = %role_id, rows = normalized.len(), "role permissions replaced");
        self.list_rows(role_id).await
    }

    pub async fn set_legacy_permissions(&self, role_id: Uuid, set: &PermissionSet) -> AppResult<()> {
        let raw = serde_json::to_string(set)
            .map_err(|e| AppError::internal(format!("failed to encode permissions: {e}")))?;

        let result = sqlx::query("UPDATE roles SET permissions = ?, updated_at = ? WHERE id = ?")
            .bind(raw)
            .bind(utc_now().to_rfc3339())
            .bind(role_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Role not found"));
        }

        self.invalidator.invalidate_role(role_id);
        Ok(())
    }

    /// Adds grants to whichever representation is authoritative for the
    /// role, so a legacy-only role is never flipped to normalized rows.
    pub async fn grant(&self, role_id: Uuid, resource: &str, actions: &[Action]) -> AppResult<()> {
        let resource = normalize_resource(resource);
        match self.load_source(role_id).await? {
            PermissionSource::Legacy(raw) => {
                let Some(mut set) = parse_legacy(&raw) else {
                    tracing::warn!(role_id = %role_id, "skipping grant on unreadable legacy document");
                    return Ok(());
                };
                for action in actions {
                    set.grant(&resource, ActionPattern::One(*action));
                }
                self.set_legacy_permissions(role_id, &set).await
            }
            PermissionSource::Normalized(_) | PermissionSource::Empty => {
                let now = utc_now().to_rfc3339();
                for action in actions {
                    sqlx::query(
                        "INSERT OR IGNORE INTO role_permissions (id, role_id, resource, action, effect, priority, created_at) VALUES (?, ?, ?, ?, ?, 0, ?)",
                    )
                    .bind(Uuid::new_v4().to_string())
                    .bind(role_id.to_string())
                    .bind(&resource)
                    .bind(action.as_str())
                    .bind(EFFECT_ALLOW)
                    .bind(&now)
                    .execute(&self.pool)
                    .await?;
                }
                self.invalidator.invalidate_role(role_id);
                Ok(())
            }
        }
    }

    /// Deletes a role with its rows and memberships; users holding it as
    /// their global role are left without one.
    pub async fn delete_role(&self, role_id: Uuid) -> AppResult<()> {
        let companies = self.companies_using(role_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
            .bind(role_id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM company_members WHERE role_id = ?")
            .bind(role_id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET role_id = NULL WHERE role_id = ?")
            .bind(role_id.to_string())
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(role_id.to_string())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::not_found("Role not found"));
        }
        tx.commit().await?;

        self.invalidator.invalidate_role(role_id);
        for company_id in companies {
            self.invalidator.invalidate_company_members(company_id);
        }

        tracing::info!(role_id = %role_id, "role deleted");
        Ok(())
    }
}
