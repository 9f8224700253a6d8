use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::row_parsers::user_from_row;
use crate::errors::{AppError, AppResult};
use crate::models::user::User;
use crate::utils::utc_now;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT id, name, role_id, created_at, updated_at FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn create(&self, name: &str, role_id: Option<Uuid>) -> AppResult<User> {
        let id = Uuid::new_v4();
        let now = utc_now();

        sqlx::query("INSERT INTO users (id, name, role_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(role_id.map(|r| r.to_string()))
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(User {
            id,
            name: name.to_string(),
            role_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn set_global_role(&self, user_id: Uuid, role_id: Option<Uuid>) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET role_id = ?, updated_at = ? WHERE id = ?")
            .bind(role_id.map(|r| r.to_string()))
            .bind(utc_now().to_rfc3339())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    /// Users whose global role carries `role_name`.
    pub async fn ids_with_global_role(&self, role_name: &str) -> AppResult<Vec<Uuid>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT u.id
            FROM users u
            INNER JOIN roles r ON r.id = u.role_id
            WHERE r.name = ? AND r.company_id IS NULL AND r.is_active = 1
            ORDER BY u.created_at, u.id
            "#,
        )
        .bind(role_name)
        .fetch_all(&self.pool)
        .await?;

        ids.iter()
            .map(|s| Uuid::parse_str(s).map_err(|e| AppError::internal(format!("invalid uuid: {}", e))))
            .collect()
    }
}
