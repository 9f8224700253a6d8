use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::row_parsers::user_permission_from_row;
use crate::errors::{AppError, AppResult};
use crate::models::permission_set::{ActionPattern, WILDCARD_ACTION};
use crate::models::user_permission::{UpsertOverrideRequest, UserPermission};
use crate::utils::{normalize_resource, utc_now};

const OVERRIDE_COLUMNS: &str =
    "id, user_id, resource, action, is_allowed, priority, time_restriction, created_at, updated_at";

/// Per-user overrides. Never cached: they are rare and security-sensitive.
#[derive(Clone)]
pub struct UserOverrideStore {
    pool: SqlitePool,
}

impl UserOverrideStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Overrides for (user, resource), highest priority first; ties go to
    /// the oldest row.
    pub async fn list_for(&self, user_id: Uuid, resource: &str) -> AppResult<Vec<UserPermission>> {
        let sql = format!(
            "SELECT {OVERRIDE_COLUMNS} FROM user_permissions WHERE user_id = ? AND resource = ? ORDER BY priority DESC, created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(normalize_resource(resource))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(user_permission_from_row).collect()
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<UserPermission>> {
        let sql = format!(
            "SELECT {OVERRIDE_COLUMNS} FROM user_permissions WHERE user_id = ? ORDER BY resource, priority DESC, created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(user_permission_from_row).collect()
    }

    /// Inserts or replaces the override for (user, resource, action).
    pub async fn upsert(&self, user_id: Uuid, req: &UpsertOverrideRequest) -> AppResult<UserPermission> {
        let resource = normalize_resource(&req.resource);
        if resource.is_empty() {
            return Err(AppError::bad_request("resource must not be empty"));
        }
        let action = ActionPattern::parse(&req.action)
            .map(|p| p.as_str().to_string())
            .ok_or_else(|| {
                AppError::bad_request(format!(
                    "action must be create, read, update, delete or {WILDCARD_ACTION}"
                ))
            })?;
        if let Some(restriction) = &req.time_restriction {
            if restriction.allowed_days.iter().any(|d| !(1..=7).contains(d)) {
                return Err(AppError::bad_request("allowed_days must be ISO weekdays 1-7"));
            }
        }

        let restriction = req
            .time_restriction
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::internal(format!("failed to encode time restriction: {e}")))?;

        let now = utc_now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO user_permissions (id, user_id, resource, action, is_allowed, priority, time_restriction, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, resource, action) DO UPDATE SET
                is_allowed = excluded.is_allowed,
                priority = excluded.priority,
                time_restriction = excluded.time_restriction,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(&resource)
        .bind(&action)
        .bind(req.is_allowed)
        .bind(req.priority)
        .bind(restriction)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {OVERRIDE_COLUMNS} FROM user_permissions WHERE user_id = ? AND resource = ? AND action = ?"
        );
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(&resource)
            .bind(&action)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(
            user_id = %user_id,
            resource = %resource,
            action = %action,
            is_allowed = req.is_allowed,
            "user override saved"
        );
        user_permission_from_row(&row)
    }

    pub async fn delete(&self, user_id: Uuid, override_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM user_permissions WHERE id = ? AND user_id = ?")
            .bind(override_id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Override not found"));
        }
        Ok(())
    }
}
