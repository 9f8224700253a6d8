use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A catalog entry naming a resource that grants can refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionCreateRequest {
    #[schema(example = "invoice")]
    pub name: String,
    #[schema(example = "Invoices")]
    pub display_name: Option<String>,
    #[schema(example = "Customer invoices")]
    pub description: Option<String>,
    /// Seed default grants on the `admin` and `user` roles.
    #[serde(default = "default_seed")]
    pub seed_defaults: bool,
}

fn default_seed() -> bool {
    true
}
