use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::principal::{AccessRequest, Principal};
use crate::errors::{AppError, AppResult};
use crate::models::permission_set::action_matches;
use crate::models::time_restriction::restriction_satisfied;
use crate::store::{CompanyMemberStore, RolePermissionStore, UserOverrideStore, UserStore};

/// Which tier produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    OverrideDeny,
    OverrideAllow,
    SuperAdmin,
    CompanyRole,
    GlobalRole,
    NoGrant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Decision {
    pub allowed: bool,
    pub source: DecisionSource,
}

impl Decision {
    fn allow(source: DecisionSource) -> Self {
        Self { allowed: true, source }
    }

    fn deny(source: DecisionSource) -> Self {
        Self { allowed: false, source }
    }

    pub fn override_present(&self) -> bool {
        matches!(
            self.source,
            DecisionSource::OverrideAllow | DecisionSource::OverrideDeny
        )
    }
}

/// Pluggable authorization decision.
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    async fn evaluate(&self, request: &AccessRequest, at: DateTime<Utc>) -> AppResult<Decision>;
}

/// Store-backed evaluator.
///
/// Evaluation order:
/// 1. user overrides (priority descending, time-restricted rows skipped
///    outside their window) -> the first live deny row denies, an allow row
///    decides only when its action matches
/// 2. super_admin global role -> allow
/// 3. active membership role in the requested company -> allow if granted
/// 4. global role -> allow if granted
/// 5. deny
///
/// A matching deny override therefore outranks the super-admin bypass.
#[derive(Clone)]
pub struct AuthorizationEvaluator {
    users: UserStore,
    overrides: UserOverrideStore,
    roles: RolePermissionStore,
    members: CompanyMemberStore,
}

impl AuthorizationEvaluator {
    pub fn new(
        users: UserStore,
        overrides: UserOverrideStore,
        roles: RolePermissionStore,
        members: CompanyMemberStore,
    ) -> Self {
        Self {
            users,
            overrides,
            roles,
            members,
        }
    }

    async fn check_overrides(
        &self,
        request: &AccessRequest,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Decision>> {
        let rows = self
            .overrides
            .list_for(request.user_id, &request.resource)
            .await?;

        for row in rows {
            if !restriction_satisfied(row.time_restriction.as_ref(), at) {
                tracing::trace!(override_id = %row.id, "override outside its time window");
                continue;
            }
            // A live deny row blocks the whole resource, whatever its action.
            let decision = if !row.is_allowed {
                Decision::deny(DecisionSource::OverrideDeny)
            } else if action_matches(&row.action, &request.action) {
                Decision::allow(DecisionSource::OverrideAllow)
            } else {
                continue;
            };
            tracing::debug!(
                user_id = %request.user_id,
                resource = %request.resource,
                action = %request.action,
                override_id = %row.id,
                allowed = decision.allowed,
                "user override applied"
            );
            return Ok(Some(decision));
        }

        Ok(None)
    }

    async fn load_principal(&self, request: &AccessRequest) -> AppResult<Principal> {
        let user = self
            .users
            .find(request.user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {} not found", request.user_id)))?;

        let global_role = match user.role_id {
            Some(role_id) => self.roles.find_role(role_id).await?,
            None => None,
        };

        Ok(Principal::new(user.id).with_global_role(global_role))
    }

    async fn company_role_grants(&self, request: &AccessRequest, company_id: uuid::Uuid) -> AppResult<bool> {
        let Some(membership) = self.members.find_active(request.user_id, company_id).await? else {
            return Ok(false);
        };
        let Some(role) = self.roles.find_role(membership.role_id).await? else {
            return Ok(false);
        };
        if !role.is_active || role.company_id.map_or(false, |scoped| scoped != company_id) {
            return Ok(false);
        }

        let set = self.roles.effective_permissions(role.id).await?;
        Ok(set.is_granted(&request.resource, &request.action))
    }

    fn log_decision(request: &AccessRequest, decision: Decision) {
        tracing::debug!(
            user_id = %request.user_id,
            resource = %request.resource,
            action = %request.action,
            scope = %request.scope(),
            allowed = decision.allowed,
            source = ?decision.source,
            "authorization decision"
        );
    }
}

#[async_trait]
impl PolicyEvaluator for AuthorizationEvaluator {
    async fn evaluate(&self, request: &AccessRequest, at: DateTime<Utc>) -> AppResult<Decision> {
        // 1. Overrides
        if let Some(decision) = self.check_overrides(request, at).await? {
            return Ok(decision);
        }

        // 2. Super admin bypass
        let principal = self.load_principal(request).await?;
        if principal.is_super_admin() {
            let decision = Decision::allow(DecisionSource::SuperAdmin);
            Self::log_decision(request, decision);
            return Ok(decision);
        }

        // 3. Company-scoped role
        if let Some(company_id) = request.company_id {
            if self.company_role_grants(request, company_id).await? {
                let decision = Decision::allow(DecisionSource::CompanyRole);
                Self::log_decision(request, decision);
                return Ok(decision);
            }
        }

        // 4. Global role
        if let Some(role) = principal.active_global_role() {
            let set = self.roles.effective_permissions(role.id).await?;
            if set.is_granted(&request.resource, &request.action) {
                let decision = Decision::allow(DecisionSource::GlobalRole);
                Self::log_decision(request, decision);
                return Ok(decision);
            }
        }

        // 5. Deny
        let decision = Decision::deny(DecisionSource::NoGrant);
        Self::log_decision(request, decision);
        Ok(decision)
    }
}
