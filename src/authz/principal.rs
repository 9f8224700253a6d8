use uuid::Uuid;

use super::scope::Scope;
use crate::models::role::DbRole;

/// The authenticated user as the evaluator sees it.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub global_role: Option<DbRole>,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            global_role: None,
        }
    }

    pub fn with_global_role(mut self, role: Option<DbRole>) -> Self {
        self.global_role = role;
        self
    }

    /// The active global role, if the user has one.
    pub fn active_global_role(&self) -> Option<&DbRole> {
        self.global_role.as_ref().filter(|role| role.is_active)
    }

    pub fn is_super_admin(&self) -> bool {
        self.active_global_role()
            .map_or(false, |r| r.name == super::roles::SUPER_ADMIN)
    }
}

/// One authorization question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    pub user_id: Uuid,
    pub resource: String,
    pub action: String,
    pub company_id: Option<Uuid>,
}

impl AccessRequest {
    pub fn new(user_id: Uuid, resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            user_id,
            resource: resource.into(),
            action: action.into(),
            company_id: None,
        }
    }

    pub fn in_company(mut self, company_id: Uuid) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.company_id = scope.company_id();
        self
    }

    pub fn scope(&self) -> Scope {
        Scope::from(self.company_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn role(name: &str, is_active: bool) -> DbRole {
        DbRole {
            id: Uuid::new_v4(),
            name: name.to_string(),
            display_name: None,
            company_id: None,
            is_active,
            permissions: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn inactive_super_admin_role_does_not_count() {
        let active = Principal::new(Uuid::new_v4()).with_global_role(Some(role("super_admin", true)));
        let inactive = Principal::new(Uuid::new_v4()).with_global_role(Some(role("super_admin", false)));

        assert!(active.is_super_admin());
        assert!(!inactive.is_super_admin());
        assert!(!Principal::new(Uuid::new_v4()).is_super_admin());
    }

    #[test]
    fn request_scope_follows_company() {
        let company = Uuid::new_v4();
        let req = AccessRequest::new(Uuid::new_v4(), "invoice", "read");
        assert_eq!(req.scope(), Scope::Global);
        assert_eq!(req.clone().in_company(company).scope(), Scope::Company(company));
        assert_eq!(req.with_scope(Scope::Company(company)).company_id, Some(company));
    }
}
