mod common;

use coachdesk_core::models::{roles, RoleScope, UserRole};
use coachdesk_core::{AppError, ErrorMetadata};
use coachdesk_db::{AccessControl, RoleCache, RoleRepository, TenantLocator};
use coachdesk_store::DocumentStore;
use common::{seed, FlakyStore, GatedStore};
use futures::future::join_all;
use serde_json::json;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

async fn seeded() -> FlakyStore {
    let store = FlakyStore::new();
    seed(store.inner(), "tenants/acme/roles/admins", json!({"uids": ["u1"]})).await;
    seed(store.inner(), "roles/superadmins", json!({"uids": ["root"]})).await;
    store
}

#[tokio::test]
async fn transport_failure_is_not_a_denial() {
    let store = seeded().await;
    let repo = RoleRepository::new(Arc::new(store.clone()));

    assert!(repo.has_role(Some("acme"), "admins", "u1").await.unwrap());

    store.set_failing(true);
    let err = repo.has_role(Some("acme"), "admins", "u1").await.unwrap_err();
    assert!(matches!(err, AppError::Transport { .. }));
    assert!(!err.is_access_denied());
    assert_eq!(err.http_status_code(), 503);
    assert_ne!(err.client_message(), "Access denied");

    store.set_failing(false);
    assert!(repo.has_role(Some("acme"), "admins", "u1").await.unwrap());
}

#[tokio::test]
async fn require_role_separates_denial_from_outage() {
    let store = seeded().await;
    let access = AccessControl::new(Arc::new(store.clone()));

    let denied = access
        .require_role(Some("acme"), roles::ADMINS, "u2")
        .await
        .unwrap_err();
    assert_eq!(denied.http_status_code(), 403);
    assert_eq!(denied.client_message(), "Access denied");

    store.set_failing(true);
    let outage = access
        .require_role(Some("acme"), roles::ADMINS, "u2")
        .await
        .unwrap_err();
    assert!(matches!(outage, AppError::Transport { .. }));
}

#[tokio::test]
async fn role_resolution_propagates_outage() {
    let store = seeded().await;
    let access = AccessControl::new(Arc::new(store.clone()));

    store.set_failing(true);
    assert!(access.resolve_user_role(Some("acme"), "u1").await.is_err());
    assert!(access.is_admin(Some("acme"), "u1").await.is_err());
}

#[tokio::test]
async fn cached_resolution_skips_store_and_never_caches_errors() {
    let store = seeded().await;
    let access = AccessControl::new(Arc::new(store.clone())).with_cache(RoleCache::new(
        NonZeroUsize::new(8).unwrap(),
        Duration::from_secs(300),
    ));

    store.set_failing(true);
    assert!(access.resolve_user_role_cached(Some("acme"), "u1").await.is_err());

    store.set_failing(false);
    assert_eq!(
        access.resolve_user_role_cached(Some("acme"), "u1").await.unwrap(),
        UserRole::Admin
    );

    let reads = store.reads();
    assert_eq!(
        access.resolve_user_role_cached(Some("acme"), "u1").await.unwrap(),
        UserRole::Admin
    );
    assert_eq!(store.reads(), reads);

    access.invalidate_all();
    access.resolve_user_role_cached(Some("acme"), "u1").await.unwrap();
    assert!(store.reads() > reads);
}

fn cached_access(store: Arc<dyn DocumentStore>) -> AccessControl {
    AccessControl::new(store).with_cache(RoleCache::new(
        NonZeroUsize::new(8).unwrap(),
        Duration::from_secs(300),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn revoke_during_resolution_does_not_leave_stale_role_cached() {
    let store = GatedStore::new("roles/superadmins");
    seed(store.inner(), "roles/superadmins", json!({"uids": ["root", "carl"]})).await;
    let access = cached_access(Arc::new(store.clone()));

    let resolving = tokio::spawn({
        let access = access.clone();
        async move { access.resolve_user_role_cached(Some("acme"), "carl").await }
    });

    // carl's superadmin membership has been read but not yet returned.
    store.reached().await;
    access.revoke_superadmin("root", "carl").await.unwrap();
    store.release();

    assert_eq!(resolving.await.unwrap().unwrap(), UserRole::Superadmin);
    assert_eq!(
        access.resolve_user_role_cached(Some("acme"), "carl").await.unwrap(),
        UserRole::Unknown
    );
}

#[tokio::test]
async fn failed_audit_stamp_still_grants_and_invalidates() {
    let store = seeded().await;
    seed(store.inner(), "tenants/acme/roles/coaches", json!({"uids": ["carl"]})).await;
    let access = cached_access(Arc::new(store.clone()));

    assert_eq!(
        access.resolve_user_role_cached(Some("acme"), "carl").await.unwrap(),
        UserRole::Coach
    );

    store.set_failing_writes(true);
    access
        .grant_role("u1", Some("acme"), roles::ADMINS, "carl")
        .await
        .unwrap();

    assert!(access.roles().has_role(Some("acme"), roles::ADMINS, "carl").await.unwrap());
    assert_eq!(
        access.resolve_user_role_cached(Some("acme"), "carl").await.unwrap(),
        UserRole::Admin
    );

    access
        .revoke_role("u1", Some("acme"), roles::ADMINS, "carl")
        .await
        .unwrap();
    assert_eq!(
        access.resolve_user_role_cached(Some("acme"), "carl").await.unwrap(),
        UserRole::Coach
    );
}

#[tokio::test]
async fn tenant_detection_propagates_outage() {
    let store = seeded().await;
    let locator = TenantLocator::new(Arc::new(store.clone()));

    store.set_failing(true);
    assert!(matches!(
        locator.detect_tenant("u1", Some("acme")).await,
        Err(AppError::Transport { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_grants_keep_every_member() {
    let store = FlakyStore::new();
    let repo = RoleRepository::new(Arc::new(store.clone()));
    let scope = RoleScope::from_tenant(Some("acme")).unwrap();

    let grants = (0..24).map(|i| {
        let repo = repo.clone();
        let scope = scope.clone();
        tokio::spawn(async move {
            repo.add_member(&scope, roles::COACHES, &format!("coach-{i}"), "admin")
                .await
        })
    });
    for result in join_all(grants).await {
        result.unwrap().unwrap();
    }

    let members = repo.list_members(&scope, roles::COACHES).await.unwrap();
    assert_eq!(members.len(), 24);
    for i in 0..24 {
        assert!(repo
            .has_role(Some("acme"), roles::COACHES, &format!("coach-{i}"))
            .await
            .unwrap());
    }
}
