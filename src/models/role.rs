use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// `None` for global roles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn is_global(&self) -> bool {
        self.company_id.is_none()
    }

    /// Whether this role may back a membership in `company_id`.
    pub fn applies_to_company(&self, company_id: Uuid) -> bool {
        self.company_id.map_or(true, |scoped| scoped == company_id)
    }
}

#[derive(Debug, Clone)]
pub struct DbRole {
    pub id: Uuid,
    pub name: String,
    pub display_name: Option<String>,
    pub company_id: Option<Uuid>,
    pub is_active: bool,
    /// Legacy grouped JSON permission document.
    pub permissions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbRole> for Role {
    fn from(db: DbRole) -> Self {
        Role {
            id: db.id,
            name: db.name,
            display_name: db.display_name,
            company_id: db.company_id,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleCreateRequest {
    #[schema(example = "company_admin")]
    pub name: String,
    #[schema(example = "Company administrator")]
    pub display_name: Option<String>,
    pub company_id: Option<Uuid>,
}

// =============================================================================
// ROLE-PERMISSION ROWS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RolePermission {
    pub id: Uuid,
    pub role_id: Uuid,
    pub resource: String,
    pub action: String,
    pub effect: String,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RolePermissionInput {
    #[schema(example = "invoice")]
    pub resource: String,
    #[schema(example = "update")]
    pub action: String,
    #[serde(default)]
    pub priority: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceRolePermissionsRequest {
    pub permissions: Vec<RolePermissionInput>,
}
