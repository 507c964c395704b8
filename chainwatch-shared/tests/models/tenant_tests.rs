use chainwatch_shared::models::tenant::{Tenant, TenantLimits, TenantPlan, UpdateTenant};
use serde_json::json;
use uuid::Uuid;

use crate::support;

#[tokio::test]
#[ignore]
async fn test_create_and_find_tenant() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;

    assert!(tenant.active);
    assert!(tenant.suspended_at.is_none());
    assert_eq!(tenant.get_plan(), Some(TenantPlan::Pro));
    assert!(!tenant.is_suspended());

    let by_id = Tenant::find_by_id(&pool, tenant.id)
        .await
        .unwrap()
        .expect("tenant missing by id");
    assert_eq!(by_id.slug, tenant.slug);

    let by_slug = Tenant::find_by_slug(&pool, &tenant.slug)
        .await
        .unwrap()
        .expect("tenant missing by slug");
    assert_eq!(by_slug.id, tenant.id);

    assert!(Tenant::find_by_id(&pool, Uuid::new_v4()).await.unwrap().is_none());

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_suspend_is_idempotent_and_reversible() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;

    let suspended = Tenant::suspend(&pool, tenant.id)
        .await
        .unwrap()
        .expect("suspend returned no tenant");
    assert!(!suspended.active);
    assert!(suspended.is_suspended());
    let first_suspension = suspended.suspended_at.expect("suspended_at not set");

    // A second suspension must not move the original timestamp
    let suspended_again = Tenant::suspend(&pool, tenant.id).await.unwrap().unwrap();
    assert_eq!(suspended_again.suspended_at, Some(first_suspension));

    let reactivated = Tenant::reactivate(&pool, tenant.id)
        .await
        .unwrap()
        .expect("reactivate returned no tenant");
    assert!(reactivated.active);
    assert!(reactivated.suspended_at.is_none());
    assert!(!reactivated.is_suspended());

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_update_merges_settings() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;

    let updated = Tenant::update(
        &pool,
        tenant.id,
        UpdateTenant {
            name: Some("Renamed Org".to_string()),
            settings: Some(json!({"timezone": "UTC"})),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .expect("update returned no tenant");
    assert_eq!(updated.name, "Renamed Org");
    assert_eq!(updated.settings["timezone"], "UTC");

    // A later settings write merges instead of replacing
    let updated = Tenant::update(
        &pool,
        tenant.id,
        UpdateTenant {
            settings: Some(json!({"alerts_muted": true})),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.settings["timezone"], "UTC");
    assert_eq!(updated.settings["alerts_muted"], true);

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_update_plan() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;

    let upgraded = Tenant::update_plan(&pool, tenant.id, TenantPlan::Enterprise)
        .await
        .unwrap()
        .expect("plan update returned no tenant");
    assert_eq!(upgraded.get_plan(), Some(TenantPlan::Enterprise));

    assert!(Tenant::update_plan(&pool, Uuid::new_v4(), TenantPlan::Free)
        .await
        .unwrap()
        .is_none());

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_limits_upsert_and_find() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;

    // New tenants have no limits row; plan defaults apply
    assert!(TenantLimits::find_by_tenant(&pool, tenant.id)
        .await
        .unwrap()
        .is_none());

    let limits = TenantLimits::upsert(&pool, tenant.id, 50, 20, 10_000, 5)
        .await
        .unwrap();
    assert_eq!(limits.max_monitors, 50);
    assert_eq!(limits.max_triggers, 20);
    assert_eq!(limits.max_api_calls_per_hour, 10_000);
    assert_eq!(limits.max_storage_gb, 5);

    // Upserting again replaces the ceilings in place
    let limits = TenantLimits::upsert(&pool, tenant.id, 5, 2, 1_000, 1)
        .await
        .unwrap();
    assert_eq!(limits.max_monitors, 5);

    let found = TenantLimits::find_by_tenant(&pool, tenant.id)
        .await
        .unwrap()
        .expect("limits row missing after upsert");
    assert_eq!(found.max_monitors, 5);
    assert_eq!(found.max_api_calls_per_hour, 1_000);

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_list_and_count() {
    let pool = support::test_pool().await;
    let first = support::seed_tenant(&pool).await;
    let second = support::seed_tenant(&pool).await;

    let count = Tenant::count(&pool).await.unwrap();
    assert!(count >= 2);

    let listed = Tenant::list(&pool, count, 0).await.unwrap();
    assert!(listed.iter().any(|t| t.id == first.id));
    assert!(listed.iter().any(|t| t.id == second.id));

    support::cleanup_tenant(&pool, first.id).await;
    support::cleanup_tenant(&pool, second.id).await;
}
