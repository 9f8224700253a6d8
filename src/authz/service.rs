use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::evaluator::{AuthorizationEvaluator, Decision, PolicyEvaluator};
use super::principal::AccessRequest;
use super::scope::Scope;
use crate::cache::{InvalidationQueue, MemoryCache, PermissionCache};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::permission_set::PermissionSet;
use crate::store::{CompanyMemberStore, PermissionCatalog, RolePermissionStore, UserOverrideStore, UserStore};

/// Entry point for authorization checks and the role-management hooks that
/// keep the cache consistent. Built once at startup and shared by reference.
#[derive(Clone)]
pub struct AuthzService {
    evaluator: Arc<dyn PolicyEvaluator>,
    pub users: UserStore,
    pub overrides: UserOverrideStore,
    pub roles: RolePermissionStore,
    pub members: CompanyMemberStore,
    pub catalog: PermissionCatalog,
    cache: PermissionCache,
    invalidator: InvalidationQueue,
}

impl AuthzService {
    /// Wires stores, cache and evaluator together. Spawns the invalidation
    /// worker, so it must run inside a Tokio runtime.
    pub fn new(pool: SqlitePool, cache: PermissionCache, queue_capacity: usize) -> (Self, JoinHandle<()>) {
        let (invalidator, worker) = InvalidationQueue::spawn(cache.clone(), queue_capacity);

        let users = UserStore::new(pool.clone());
        let overrides = UserOverrideStore::new(pool.clone());
        let roles = RolePermissionStore::new(pool.clone(), cache.clone(), invalidator.clone());
        let members = CompanyMemberStore::new(pool.clone(), cache.clone(), invalidator.clone());
        let catalog = PermissionCatalog::new(pool, cache.clone(), invalidator.clone(), roles.clone());

        let evaluator = AuthorizationEvaluator::new(
            users.clone(),
            overrides.clone(),
            roles.clone(),
            members.clone(),
        );

        let service = Self {
            evaluator: Arc::new(evaluator),
            users,
            overrides,
            roles,
            members,
            catalog,
            cache,
            invalidator,
        };
        (service, worker)
    }

    pub fn from_config(pool: SqlitePool, config: &Config) -> (Self, JoinHandle<()>) {
        let cache = if config.cache_enabled {
            PermissionCache::new(Arc::new(MemoryCache::new()), config.cache_ttls)
        } else {
            PermissionCache::disabled()
        };
        Self::new(pool, cache, config.invalidation_queue_capacity)
    }

    /// Replaces the decision engine, e.g. with a test double.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn PolicyEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub async fn check_at(&self, request: &AccessRequest, at: DateTime<Utc>) -> AppResult<Decision> {
        self.evaluator.evaluate(request, at).await
    }

    pub async fn check(&self, request: &AccessRequest) -> AppResult<Decision> {
        self.check_at(request, Utc::now()).await
    }

    pub async fn is_allowed(
        &self,
        user_id: Uuid,
        resource: &str,
        action: &str,
        company_id: Option<Uuid>,
    ) -> AppResult<bool> {
        let mut request = AccessRequest::new(user_id, resource, action);
        request.company_id = company_id;
        Ok(self.check(&request).await?.allowed)
    }

    pub async fn is_allowed_system(&self, user_id: Uuid, resource: &str, action: &str) -> AppResult<bool> {
        self.is_allowed(user_id, resource, action, None).await
    }

    pub async fn is_allowed_in_company(
        &self,
        user_id: Uuid,
        resource: &str,
        action: &str,
        company_id: Uuid,
    ) -> AppResult<bool> {
        self.is_allowed(user_id, resource, action, Some(company_id)).await
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    pub async fn effective_permissions(&self, role_id: Uuid) -> AppResult<PermissionSet> {
        self.roles.effective_permissions(role_id).await
    }

    /// Drops the cached set for a role; the next read goes to the store.
    pub async fn invalidate_role(&self, role_id: Uuid) {
        self.roles.invalidate(role_id).await;
    }

    /// Waits for queued background invalidations to finish.
    pub async fn flush_invalidations(&self) {
        self.invalidator.flush().await;
    }

    /// Role names the user holds in `scope`.
    pub async fn roles_for_user(&self, user_id: Uuid, scope: Scope) -> AppResult<Vec<String>> {
        match scope {
            Scope::Global => {
                let user = self
                    .users
                    .find(user_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("user {} not found", user_id)))?;
                let Some(role_id) = user.role_id else {
                    return Ok(Vec::new());
                };
                Ok(self
                    .roles
                    .find_role(role_id)
                    .await?
                    .filter(|role| role.is_active)
                    .map(|role| vec![role.name])
                    .unwrap_or_default())
            }
            Scope::Company(company_id) => {
                let Some(membership) = self.members.find_active(user_id, company_id).await? else {
                    return Ok(Vec::new());
                };
                Ok(self
                    .roles
                    .find_role(membership.role_id)
                    .await?
                    .filter(|role| role.is_active)
                    .map(|role| vec![role.name])
                    .unwrap_or_default())
            }
        }
    }

    /// Users holding a role named `role_name` in `scope`.
    pub async fn users_for_role(&self, role_name: &str, scope: Scope) -> AppResult<Vec<Uuid>> {
        match scope {
            Scope::Global => self.users.ids_with_global_role(role_name).await,
            Scope::Company(company_id) => Ok(self
                .members
                .list_active(company_id)
                .await?
                .into_iter()
                .filter(|member| member.role_name == role_name)
                .map(|member| member.user_id)
                .collect()),
        }
    }
}
