use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::time_restriction::TimeRestriction;

/// Per-user override rule.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPermission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resource: String,
    pub action: String,
    pub is_allowed: bool,
    pub priority: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_restriction: Option<TimeRestriction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpsertOverrideRequest {
    #[schema(example = "invoice")]
    pub resource: String,
    #[schema(example = "delete")]
    pub action: String,
    pub is_allowed: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub time_restriction: Option<TimeRestriction>,
}
