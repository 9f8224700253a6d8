use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};

use company_authz::authz::AuthzService;
use company_authz::cache::{keys, Cache, CacheError, MemoryCache, PermissionCache};
use company_authz::config::CacheTtls;
use company_authz::models::permission_set::{Action, ActionPattern, PermissionSet};
use company_authz::models::role::{Role, RoleCreateRequest, RolePermissionInput};
use company_authz::store::PermissionSource;

async fn setup_with(cache: PermissionCache) -> Result<(TempDir, SqlitePool, AuthzService)> {
    let dir = tempdir()?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    let (authz, _worker) = AuthzService::new(pool.clone(), cache, 64);
    Ok((dir, pool, authz))
}

async fn setup() -> Result<(TempDir, SqlitePool, AuthzService, Arc<MemoryCache>)> {
    let backend = Arc::new(MemoryCache::new());
    let cache = PermissionCache::new(backend.clone(), CacheTtls::default());
    let (dir, pool, authz) = setup_with(cache).await?;
    Ok((dir, pool, authz, backend))
}

async fn new_role(authz: &AuthzService, name: &str) -> Result<Role> {
    Ok(authz
        .roles
        .create_role(&RoleCreateRequest {
            name: name.to_string(),
            display_name: None,
            company_id: None,
        })
        .await?)
}

fn grant(resource: &str, action: &str) -> RolePermissionInput {
    RolePermissionInput {
        resource: resource.to_string(),
        action: action.to_string(),
        priority: 0,
    }
}

fn legacy_reports_read() -> PermissionSet {
    let mut set = PermissionSet::default();
    set.grant("reports", ActionPattern::One(Action::Read));
    set
}

#[tokio::test]
async fn normalized_rows_supersede_legacy_document() -> Result<()> {
    let (_dir, _pool, authz, _backend) = setup().await?;
    let role = new_role(&authz, "analyst").await?;
    authz.roles.set_legacy_permissions(role.id, &legacy_reports_read()).await?;
    authz.roles.replace_permissions(role.id, &[grant("invoice", "update")]).await?;

    assert!(matches!(authz.roles.load_source(role.id).await?, PermissionSource::Normalized(_)));

    let set = authz.effective_permissions(role.id).await?;
    assert!(set.is_granted("invoice", "update"));
    assert!(!set.is_granted("reports", "read"));
    Ok(())
}

#[tokio::test]
async fn clearing_rows_hands_role_back_to_legacy_document() -> Result<()> {
    let (_dir, _pool, authz, _backend) = setup().await?;
    let role = new_role(&authz, "analyst").await?;
    authz.roles.set_legacy_permissions(role.id, &legacy_reports_read()).await?;
    authz.roles.replace_permissions(role.id, &[grant("invoice", "update")]).await?;
    assert!(authz.effective_permissions(role.id).await?.is_granted("invoice", "update"));

    authz.roles.replace_permissions(role.id, &[]).await?;
    authz.flush_invalidations().await;

    let set = authz.effective_permissions(role.id).await?;
    assert!(set.is_granted("reports", "read"));
    assert!(!set.is_granted("invoice", "update"));
    Ok(())
}

#[tokio::test]
async fn legacy_bytes_are_cached_verbatim() -> Result<()> {
    let (_dir, _pool, authz, backend) = setup().await?;
    let role = new_role(&authz, "viewer").await?;
    let set = legacy_reports_read();
    authz.roles.set_legacy_permissions(role.id, &set).await?;
    authz.flush_invalidations().await;

    let resolved = authz.effective_permissions(role.id).await?;
    assert_eq!(resolved, set);

    let cached = backend.get(&keys::role_permissions(role.id)).await?;
    assert_eq!(cached, Some(serde_json::to_vec(&set)?));
    Ok(())
}

#[tokio::test]
async fn cached_set_is_served_until_invalidated() -> Result<()> {
    let (_dir, pool, authz, _backend) = setup().await?;
    let role = new_role(&authz, "viewer").await?;
    authz.roles.set_legacy_permissions(role.id, &legacy_reports_read()).await?;
    authz.flush_invalidations().await;
    assert!(authz.effective_permissions(role.id).await?.is_granted("reports", "read"));

    // Edit the store behind the cache's back.
    sqlx::query("UPDATE roles SET permissions = ? WHERE id = ?")
        .bind(r#"{"reports":{"read":true,"update":true}}"#)
        .bind(role.id.to_string())
        .execute(&pool)
        .await?;
    assert!(!authz.effective_permissions(role.id).await?.is_granted("reports", "update"));

    authz.invalidate_role(role.id).await;
    assert!(authz.effective_permissions(role.id).await?.is_granted("reports", "update"));
    Ok(())
}

#[tokio::test]
async fn malformed_legacy_document_grants_nothing_and_is_not_cached() -> Result<()> {
    let (_dir, pool, authz, backend) = setup().await?;
    let role = new_role(&authz, "broken").await?;
    sqlx::query("UPDATE roles SET permissions = ? WHERE id = ?")
        .bind(r#"{"users": {"read": tru"#)
        .bind(role.id.to_string())
        .execute(&pool)
        .await?;

    let set = authz.effective_permissions(role.id).await?;
    assert!(set.is_empty());
    assert!(!backend.contains_key(&keys::role_permissions(role.id)));
    Ok(())
}

#[tokio::test]
async fn replacing_rows_invalidates_cached_set() -> Result<()> {
    let (_dir, _pool, authz, backend) = setup().await?;
    let role = new_role(&authz, "clerk").await?;
    authz.roles.replace_permissions(role.id, &[grant("invoice", "read")]).await?;
    authz.flush_invalidations().await;

    assert!(authz.effective_permissions(role.id).await?.is_granted("invoice", "read"));
    assert!(backend.contains_key(&keys::role_permissions(role.id)));

    authz
        .roles
        .replace_permissions(role.id, &[grant("invoice", "read"), grant("invoice", "delete")])
        .await?;
    authz.flush_invalidations().await;
    assert!(!backend.contains_key(&keys::role_permissions(role.id)));

    let set = authz.effective_permissions(role.id).await?;
    assert!(set.is_granted("invoice", "delete"));
    Ok(())
}

#[tokio::test]
async fn unknown_action_is_rejected() -> Result<()> {
    let (_dir, _pool, authz, _backend) = setup().await?;
    let role = new_role(&authz, "clerk").await?;
    let err = authz
        .roles
        .replace_permissions(role.id, &[grant("invoice", "approve")])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("approve"), "unexpected error: {err}");
    Ok(())
}

#[tokio::test]
async fn duplicate_role_name_conflicts_within_scope() -> Result<()> {
    let (_dir, _pool, authz, _backend) = setup().await?;
    new_role(&authz, "clerk").await?;
    assert!(new_role(&authz, "clerk").await.is_err());

    // Same name scoped to a company is a different role.
    authz
        .roles
        .create_role(&RoleCreateRequest {
            name: "clerk".to_string(),
            display_name: None,
            company_id: Some(uuid::Uuid::new_v4()),
        })
        .await?;
    Ok(())
}

#[tokio::test]
async fn deleting_role_drops_grants() -> Result<()> {
    let (_dir, _pool, authz, _backend) = setup().await?;
    let role = new_role(&authz, "temp").await?;
    authz.roles.replace_permissions(role.id, &[grant("invoice", "*")]).await?;
    let user = authz.users.create("Hank", Some(role.id)).await?;

    authz.roles.delete_role(role.id).await?;
    authz.flush_invalidations().await;

    assert!(authz.roles.find_role(role.id).await?.is_none());
    assert!(authz.effective_permissions(role.id).await?.is_empty());
    let user = authz.users.find(user.id).await?.expect("user");
    assert_eq!(user.role_id, None);
    Ok(())
}

struct BrokenCache;

#[async_trait]
impl Cache for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Unavailable("down".into()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("down".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("down".into()))
    }
}

#[tokio::test]
async fn failing_cache_does_not_affect_results() -> Result<()> {
    let cache = PermissionCache::new(Arc::new(BrokenCache), CacheTtls::default());
    let (_dir, _pool, authz) = setup_with(cache).await?;
    let role = new_role(&authz, "clerk").await?;
    authz.roles.replace_permissions(role.id, &[grant("invoice", "update")]).await?;
    authz.flush_invalidations().await;

    let user = authz.users.create("Ivy", Some(role.id)).await?;
    assert!(authz.is_allowed_system(user.id, "invoice", "update").await?);
    assert!(!authz.is_allowed_system(user.id, "invoice", "delete").await?);
    Ok(())
}
