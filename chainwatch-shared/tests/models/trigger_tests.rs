use chainwatch_shared::models::tenant::TenantLimits;
use chainwatch_shared::models::trigger::{CreateTrigger, Trigger, TriggerKind, UpdateTrigger};
use serde_json::json;
use uuid::Uuid;

use crate::support;

async fn create_webhook_trigger(
    pool: &sqlx::PgPool,
    tenant_id: Uuid,
    name: &str,
) -> Option<Trigger> {
    Trigger::create(
        pool,
        CreateTrigger {
            tenant_id,
            name: name.to_string(),
            kind: TriggerKind::Webhook,
            config: json!({"url": "https://hooks.example/chainwatch"}),
        },
        100,
    )
    .await
    .expect("trigger insert failed")
}

#[tokio::test]
#[ignore]
async fn test_create_and_find_trigger() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;

    let trigger = create_webhook_trigger(&pool, tenant.id, "oncall hook")
        .await
        .expect("quota rejected the first trigger");

    assert_eq!(trigger.tenant_id, tenant.id);
    assert_eq!(trigger.kind, "webhook");
    assert_eq!(trigger.get_kind(), Some(TriggerKind::Webhook));
    assert!(trigger.active);
    assert_eq!(trigger.config["url"], "https://hooks.example/chainwatch");

    let found = Trigger::find_by_id_and_tenant(&pool, trigger.id, tenant.id)
        .await
        .unwrap()
        .expect("trigger missing");
    assert_eq!(found.name, "oncall hook");

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_quota_ceiling_blocks_create() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;

    TenantLimits::upsert(&pool, tenant.id, 10, 1, 1_000, 1)
        .await
        .unwrap();

    assert!(create_webhook_trigger(&pool, tenant.id, "allowed").await.is_some());
    assert!(
        create_webhook_trigger(&pool, tenant.id, "rejected").await.is_none(),
        "ceiling of one must reject the second trigger"
    );

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_update_merges_config_and_toggles_active() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;

    let trigger = create_webhook_trigger(&pool, tenant.id, "mutable").await.unwrap();

    let updated = Trigger::update(
        &pool,
        trigger.id,
        tenant.id,
        UpdateTrigger {
            name: Some("renamed hook".to_string()),
            config: Some(json!({"secret": "whsec_test"})),
            active: Some(false),
        },
    )
    .await
    .unwrap()
    .expect("update returned no trigger");

    assert_eq!(updated.name, "renamed hook");
    assert!(!updated.active);
    assert_eq!(updated.config["url"], "https://hooks.example/chainwatch");
    assert_eq!(updated.config["secret"], "whsec_test");

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_tenant_isolation_and_delete() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let other = support::seed_tenant(&pool).await;

    let trigger = create_webhook_trigger(&pool, tenant.id, "guarded").await.unwrap();

    assert!(Trigger::find_by_id_and_tenant(&pool, trigger.id, other.id)
        .await
        .unwrap()
        .is_none());
    assert!(!Trigger::delete(&pool, trigger.id, other.id).await.unwrap());

    assert_eq!(Trigger::count_by_tenant(&pool, tenant.id).await.unwrap(), 1);
    assert_eq!(Trigger::count_by_tenant(&pool, other.id).await.unwrap(), 0);

    assert!(Trigger::delete(&pool, trigger.id, tenant.id).await.unwrap());
    assert!(!Trigger::delete(&pool, trigger.id, tenant.id).await.unwrap());

    let listed = Trigger::list_by_tenant(&pool, tenant.id, 10, 0).await.unwrap();
    assert!(listed.is_empty());

    support::cleanup_tenant(&pool, tenant.id).await;
    support::cleanup_tenant(&pool, other.id).await;
}
