use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::member::{CompanyMember, CompanyMemberView};
use crate::models::permission::Permission;
use crate::models::role::{DbRole, RolePermission};
use crate::models::time_restriction::TimeRestriction;
use crate::models::user::User;
use crate::models::user_permission::UserPermission;
use crate::utils::parse_datetime;

fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, AppError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| AppError::internal(format!("missing {}: {}", name, e)))
}

fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s).map_err(|e| AppError::internal(format!("invalid uuid: {}", e)))
}

fn parse_opt_uuid(s: Option<String>) -> Result<Option<Uuid>, AppError> {
    match s {
        Some(s) if !s.trim().is_empty() => Ok(Some(parse_uuid(&s)?)),
        _ => Ok(None),
    }
}

pub fn db_role_from_row(row: &SqliteRow) -> Result<DbRole, AppError> {
    let id_s: String = col(row, "id")?;
    let name: String = col(row, "name")?;
    let display_name: Option<String> = col(row, "display_name")?;
    let company_id_s: Option<String> = col(row, "company_id")?;
    let is_active: bool = col(row, "is_active")?;
    let permissions: Option<String> = col(row, "permissions")?;
    let created_at_s: String = col(row, "created_at")?;
    let updated_at_s: String = col(row, "updated_at")?;

    Ok(DbRole {
        id: parse_uuid(&id_s)?,
        name,
        display_name,
        company_id: parse_opt_uuid(company_id_s)?,
        is_active,
        permissions,
        created_at: parse_datetime(&created_at_s)?,
        updated_at: parse_datetime(&updated_at_s)?,
    })
}

pub fn role_permission_from_row(row: &SqliteRow) -> Result<RolePermission, AppError> {
    let id_s: String = col(row, "id")?;
    let role_id_s: String = col(row, "role_id")?;
    let created_at_s: String = col(row, "created_at")?;

    Ok(RolePermission {
        id: parse_uuid(&id_s)?,
        role_id: parse_uuid(&role_id_s)?,
        resource: col(row, "resource")?,
        action: col(row, "action")?,
        effect: col(row, "effect")?,
        priority: col(row, "priority")?,
        created_at: parse_datetime(&created_at_s)?,
    })
}

pub fn permission_from_row(row: &SqliteRow) -> Result<Permission, AppError> {
    let id_s: String = col(row, "id")?;
    let created_at_s: String = col(row, "created_at")?;
    let updated_at_s: String = col(row, "updated_at")?;

    Ok(Permission {
        id: parse_uuid(&id_s)?,
        name: col(row, "name")?,
        display_name: col(row, "display_name")?,
        description: col(row, "description")?,
        is_active: col(row, "is_active")?,
        created_at: parse_datetime(&created_at_s)?,
        updated_at: parse_datetime(&updated_at_s)?,
    })
}

/// A stored restriction that fails to parse is an error rather than "no
/// restriction", so a corrupted deny row can never silently widen access.
pub fn user_permission_from_row(row: &SqliteRow) -> Result<UserPermission, AppError> {
    let id_s: String = col(row, "id")?;
    let user_id_s: String = col(row, "user_id")?;
    let restriction_s: Option<String> = col(row, "time_restriction")?;
    let created_at_s: String = col(row, "created_at")?;
    let updated_at_s: String = col(row, "updated_at")?;

    let time_restriction = match restriction_s {
        Some(raw) if !raw.trim().is_empty() && raw.trim() != "null" => Some(
            serde_json::from_str::<TimeRestriction>(&raw).map_err(|e| {
                AppError::internal(format!("invalid time restriction on override {}: {}", id_s, e))
            })?,
        ),
        _ => None,
    };

    Ok(UserPermission {
        id: parse_uuid(&id_s)?,
        user_id: parse_uuid(&user_id_s)?,
        resource: col(row, "resource")?,
        action: col(row, "action")?,
        is_allowed: col(row, "is_allowed")?,
        priority: col(row, "priority")?,
        time_restriction,
        created_at: parse_datetime(&created_at_s)?,
        updated_at: parse_datetime(&updated_at_s)?,
    })
}

pub fn company_member_from_row(row: &SqliteRow) -> Result<CompanyMember, AppError> {
    let id_s: String = col(row, "id")?;
    let company_id_s: String = col(row, "company_id")?;
    let user_id_s: String = col(row, "user_id")?;
    let role_id_s: String = col(row, "role_id")?;
    let joined_at_s: String = col(row, "joined_at")?;

    Ok(CompanyMember {
        id: parse_uuid(&id_s)?,
        company_id: parse_uuid(&company_id_s)?,
        user_id: parse_uuid(&user_id_s)?,
        role_id: parse_uuid(&role_id_s)?,
        is_active: col(row, "is_active")?,
        joined_at: parse_datetime(&joined_at_s)?,
    })
}

pub fn company_member_view_from_row(row: &SqliteRow) -> Result<CompanyMemberView, AppError> {
    let user_id_s: String = col(row, "user_id")?;
    let role_id_s: String = col(row, "role_id")?;

    Ok(CompanyMemberView {
        user_id: parse_uuid(&user_id_s)?,
        role_id: parse_uuid(&role_id_s)?,
        role_name: col(row, "role_name")?,
    })
}

pub fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
    let id_s: String = col(row, "id")?;
    let role_id_s: Option<String> = col(row, "role_id")?;
    let created_at_s: String = col(row, "created_at")?;
    let updated_at_s: String = col(row, "updated_at")?;

    Ok(User {
        id: parse_uuid(&id_s)?,
        name: col(row, "name")?,
        role_id: parse_opt_uuid(role_id_s)?,
        created_at: parse_datetime(&created_at_s)?,
        updated_at: parse_datetime(&updated_at_s)?,
    })
}
