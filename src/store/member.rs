use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cache::{keys, InvalidationQueue, PermissionCache};
use crate::db::row_parsers::{company_member_from_row, company_member_view_from_row, db_role_from_row};
use crate::errors::{AppError, AppResult};
use crate::models::member::{AddMemberRequest, CompanyMember, CompanyMemberView};
use crate::models::role::Role;
use crate::utils::utc_now;

#[derive(Clone)]
pub struct CompanyMemberStore {
    pool: SqlitePool,
    cache: PermissionCache,
    invalidator: InvalidationQueue,
}

impl CompanyMemberStore {
    pub fn new(pool: SqlitePool, cache: PermissionCache, invalidator: InvalidationQueue) -> Self {
        Self {
            pool,
            cache,
            invalidator,
        }
    }

    /// The user's active membership in `company_id`, if any.
    pub async fn find_active(&self, user_id: Uuid, company_id: Uuid) -> AppResult<Option<CompanyMember>> {
        let row = sqlx::query(
            r#"
            SELECT id, company_id, user_id, role_id, is_active, joined_at
            FROM company_members
            WHERE user_id = ? AND company_id = ? AND is_active = 1
            ORDER BY joined_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.to_string())
        .bind(company_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(company_member_from_row).transpose()
    }

    /// Active members of a company holding an active role, with role names,
    /// read through the member-list cache.
    pub async fn list_active(&self, company_id: Uuid) -> AppResult<Vec<CompanyMemberView>> {
        let key = keys::company_members(company_id);
        if let Some(members) = self.cache.get_json::<Vec<CompanyMemberView>>(&key).await {
            return Ok(members);
        }

        let rows = sqlx::query(
            r#"
            SELECT cm.user_id, cm.role_id, r.name AS role_name
            FROM company_members cm
            INNER JOIN roles r ON r.id = cm.role_id
            WHERE cm.company_id = ? AND cm.is_active = 1 AND r.is_active = 1
            ORDER BY cm.joined_at, cm.user_id
            "#,
        )
        .bind(company_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let members = rows
            .iter()
            .map(company_member_view_from_row)
            .collect::<AppResult<Vec<_>>>()?;

        self.cache
            .set_json(&key, &members, self.cache.ttls().company_members)
            .await;
        Ok(members)
    }

    /// Adds a membership. A user may hold only one active membership per
    /// company, and the role must be global or scoped to that company.
    pub async fn add(&self, company_id: Uuid, req: &AddMemberRequest) -> AppResult<CompanyMember> {
        let role_row = sqlx::query(
            "SELECT id, name, display_name, company_id, is_active, permissions, created_at, updated_at FROM roles WHERE id = ?",
        )
        .bind(req.role_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Role not found"))?;
        let role = Role::from(db_role_from_row(&role_row)?);
        if !role.applies_to_company(company_id) {
            return Err(AppError::bad_request("role belongs to a different company"));
        }

        let id = Uuid::new_v4();
        let now = utc_now();
        let mut tx = self.pool.begin().await?;

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM company_members WHERE user_id = ? AND company_id = ? AND is_active = 1",
        )
        .bind(req.user_id.to_string())
        .bind(company_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(AppError::conflict("user already has an active membership in this company"));
        }

        sqlx::query(
            "INSERT INTO company_members (id, company_id, user_id, role_id, is_active, joined_at) VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(id.to_string())
        .bind(company_id.to_string())
        .bind(req.user_id.to_string())
        .bind(req.role_id.to_string())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.invalidator.invalidate_company_members(company_id);
        tracing::info!(company_id = %company_id, user_id = %req.user_id, role_id = %req.role_id, "member added");

        Ok(CompanyMember {
            id,
            company_id,
            user_id: req.user_id,
            role_id: req.role_id,
            is_active: true,
            joined_at: now,
        })
    }

    pub async fn deactivate(&self, company_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE company_members SET is_active = 0 WHERE company_id = ? AND user_id = ? AND is_active = 1",
        )
        .bind(company_id.to_string())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Active membership not found"));
        }

        self.invalidator.invalidate_company_members(company_id);
        tracing::info!(company_id = %company_id, user_id = %user_id, "member deactivated");
        Ok(())
    }
}
