use std::sync::Arc;

use anyhow::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use uuid::Uuid;

use company_authz::authz::{roles, AuthzService, Scope};
use company_authz::cache::{MemoryCache, PermissionCache};
use company_authz::config::CacheTtls;
use company_authz::errors::AppError;
use company_authz::models::member::AddMemberRequest;
use company_authz::models::permission::PermissionCreateRequest;
use company_authz::models::permission_set::{Action, ActionPattern, PermissionSet};
use company_authz::models::role::{Role, RoleCreateRequest};

async fn setup() -> Result<(TempDir, SqlitePool, AuthzService)> {
    let dir = tempdir()?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    let cache = PermissionCache::new(Arc::new(MemoryCache::new()), CacheTtls::default());
    let (authz, _worker) = AuthzService::new(pool.clone(), cache, 64);
    Ok((dir, pool, authz))
}

async fn new_role(authz: &AuthzService, name: &str, company_id: Option<Uuid>) -> Result<Role> {
    Ok(authz
        .roles
        .create_role(&RoleCreateRequest {
            name: name.to_string(),
            display_name: None,
            company_id,
        })
        .await?)
}

fn catalog_entry(name: &str) -> PermissionCreateRequest {
    PermissionCreateRequest {
        name: name.to_string(),
        display_name: None,
        description: None,
        seed_defaults: true,
    }
}

#[tokio::test]
async fn second_active_membership_conflicts() -> Result<()> {
    let (_dir, _pool, authz) = setup().await?;
    let company = Uuid::new_v4();
    let role = new_role(&authz, "member", Some(company)).await?;
    let user = authz.users.create("Alice", None).await?;
    let req = AddMemberRequest { user_id: user.id, role_id: role.id };

    authz.members.add(company, &req).await?;
    let err = authz.members.add(company, &req).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    // Deactivating frees the slot.
    authz.members.deactivate(company, user.id).await?;
    authz.members.add(company, &req).await?;
    Ok(())
}

#[tokio::test]
async fn role_from_another_company_is_rejected() -> Result<()> {
    let (_dir, _pool, authz) = setup().await?;
    let role = new_role(&authz, "member", Some(Uuid::new_v4())).await?;
    let user = authz.users.create("Bob", None).await?;

    let err = authz
        .members
        .add(Uuid::new_v4(), &AddMemberRequest { user_id: user.id, role_id: role.id })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn roles_for_user_by_scope() -> Result<()> {
    let (_dir, _pool, authz) = setup().await?;
    let company = Uuid::new_v4();
    let global = new_role(&authz, roles::USER, None).await?;
    let scoped = new_role(&authz, "company_admin", Some(company)).await?;
    let user = authz.users.create("Carol", Some(global.id)).await?;
    authz
        .members
        .add(company, &AddMemberRequest { user_id: user.id, role_id: scoped.id })
        .await?;

    assert_eq!(authz.roles_for_user(user.id, Scope::Global).await?, vec![roles::USER.to_string()]);
    assert_eq!(
        authz.roles_for_user(user.id, Scope::Company(company)).await?,
        vec!["company_admin".to_string()]
    );
    assert!(authz.roles_for_user(user.id, Scope::Company(Uuid::new_v4())).await?.is_empty());

    let err = authz.roles_for_user(Uuid::new_v4(), Scope::Global).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn users_for_role_by_scope() -> Result<()> {
    let (_dir, _pool, authz) = setup().await?;
    let company = Uuid::new_v4();
    let global = new_role(&authz, roles::ADMIN, None).await?;
    let admin = authz.users.create("Dave", Some(global.id)).await?;
    let member = authz.users.create("Erin", None).await?;

    assert_eq!(authz.users_for_role(roles::ADMIN, Scope::Global).await?, vec![admin.id]);
    assert!(authz.users_for_role(roles::ADMIN, Scope::Company(company)).await?.is_empty());

    // The empty member list above is now cached; adding a member must evict it.
    authz
        .members
        .add(company, &AddMemberRequest { user_id: member.id, role_id: global.id })
        .await?;
    authz.flush_invalidations().await;

    assert_eq!(
        authz.users_for_role(roles::ADMIN, Scope::Company(company)).await?,
        vec![member.id]
    );
    Ok(())
}

#[tokio::test]
async fn scope_tokens_parse() -> Result<()> {
    let company = Uuid::new_v4();
    assert_eq!("*".parse::<Scope>()?, Scope::Global);
    assert_eq!(format!("company:{company}").parse::<Scope>()?, Scope::Company(company));
    assert!(matches!("company:nope".parse::<Scope>(), Err(AppError::InvalidScope(_))));
    assert!(matches!("tenant:1".parse::<Scope>(), Err(AppError::InvalidScope(_))));
    Ok(())
}

#[tokio::test]
async fn registering_a_resource_seeds_default_roles() -> Result<()> {
    let (_dir, _pool, authz) = setup().await?;
    let admin = new_role(&authz, roles::ADMIN, None).await?;
    let user = new_role(&authz, roles::USER, None).await?;
    let other = new_role(&authz, "auditor", None).await?;

    authz.catalog.create(&catalog_entry("invoice")).await?;
    authz.flush_invalidations().await;

    let admin_set = authz.effective_permissions(admin.id).await?;
    for action in Action::ALL {
        assert!(admin_set.is_granted("invoice", action.as_str()), "admin missing {action}");
    }
    let user_set = authz.effective_permissions(user.id).await?;
    assert!(user_set.is_granted("invoice", "read"));
    assert!(!user_set.is_granted("invoice", "update"));
    assert!(authz.effective_permissions(other.id).await?.is_empty());

    assert!(authz.catalog.find_by_name("Invoice").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn seeding_keeps_legacy_roles_on_their_document() -> Result<()> {
    let (_dir, _pool, authz) = setup().await?;
    let admin = new_role(&authz, roles::ADMIN, None).await?;
    let mut legacy = PermissionSet::default();
    legacy.grant("reports", ActionPattern::One(Action::Read));
    authz.roles.set_legacy_permissions(admin.id, &legacy).await?;

    authz.catalog.create(&catalog_entry("invoice")).await?;
    authz.flush_invalidations().await;

    assert!(authz.roles.list_rows(admin.id).await?.is_empty());
    let set = authz.effective_permissions(admin.id).await?;
    assert!(set.is_granted("reports", "read"));
    assert!(set.is_granted("invoice", "delete"));
    Ok(())
}

#[tokio::test]
async fn duplicate_catalog_entry_conflicts() -> Result<()> {
    let (_dir, _pool, authz) = setup().await?;
    authz.catalog.create(&catalog_entry("invoice")).await?;
    let err = authz.catalog.create(&catalog_entry("INVOICE")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    authz.flush_invalidations().await;
    assert_eq!(authz.catalog.list().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn deactivated_role_drops_out_of_company_lookups() -> Result<()> {
    let (_dir, _pool, authz) = setup().await?;
    let company = Uuid::new_v4();
    let role = new_role(&authz, "company_admin", Some(company)).await?;
    let user = authz.users.create("Nora", None).await?;
    authz
        .members
        .add(company, &AddMemberRequest { user_id: user.id, role_id: role.id })
        .await?;
    authz.flush_invalidations().await;

    // Warm the member-list cache.
    assert_eq!(
        authz.users_for_role("company_admin", Scope::Company(company)).await?,
        vec![user.id]
    );

    authz.roles.set_active(role.id, false).await?;
    authz.flush_invalidations().await;

    assert!(authz.roles_for_user(user.id, Scope::Company(company)).await?.is_empty());
    assert!(authz
        .users_for_role("company_admin", Scope::Company(company))
        .await?
        .is_empty());
    assert!(authz.members.list_active(company).await?.is_empty());
    Ok(())
}
