use chainwatch_shared::models::monitor::{CreateMonitor, Monitor, MonitorFilter, UpdateMonitor};
use chainwatch_shared::models::tenant::TenantLimits;
use serde_json::json;
use uuid::Uuid;

use crate::support;

fn watch_addresses() -> Vec<String> {
    vec!["0x742d35Cc6634C0532925a3b844Bc454e4438f44e".to_string()]
}

async fn create_monitor(
    pool: &sqlx::PgPool,
    tenant_id: Uuid,
    network_id: Uuid,
    name: &str,
) -> Option<Monitor> {
    Monitor::create(
        pool,
        CreateMonitor {
            tenant_id,
            network_id,
            name: name.to_string(),
            addresses: watch_addresses(),
            config: json!({}),
        },
        100,
    )
    .await
    .expect("monitor insert failed")
}

#[tokio::test]
#[ignore]
async fn test_create_and_find_monitor() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let network = support::seed_network(&pool).await;

    let monitor = create_monitor(&pool, tenant.id, network.id, "Treasury watch")
        .await
        .expect("quota rejected the first monitor");

    assert_eq!(monitor.tenant_id, tenant.id);
    assert_eq!(monitor.network_id, network.id);
    assert!(!monitor.paused);
    assert_eq!(monitor.addresses, watch_addresses());

    let found = Monitor::find_by_id_and_tenant(&pool, monitor.id, tenant.id)
        .await
        .unwrap()
        .expect("monitor missing");
    assert_eq!(found.name, "Treasury watch");

    support::cleanup_tenant(&pool, tenant.id).await;
    support::cleanup_network(&pool, network.id).await;
}

#[tokio::test]
#[ignore]
async fn test_create_fails_for_unknown_network() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;

    let result = Monitor::create(
        &pool,
        CreateMonitor {
            tenant_id: tenant.id,
            network_id: Uuid::new_v4(),
            name: "orphan".to_string(),
            addresses: watch_addresses(),
            config: json!({}),
        },
        100,
    )
    .await;

    assert!(result.is_err(), "Unknown network should violate the foreign key");

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_quota_ceiling_blocks_create() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let network = support::seed_network(&pool).await;

    TenantLimits::upsert(&pool, tenant.id, 1, 10, 1_000, 1)
        .await
        .unwrap();

    let first = create_monitor(&pool, tenant.id, network.id, "allowed").await;
    assert!(first.is_some());

    let second = create_monitor(&pool, tenant.id, network.id, "over the line").await;
    assert!(second.is_none(), "ceiling of one must reject the second monitor");

    // Raising the ceiling unblocks creation
    TenantLimits::upsert(&pool, tenant.id, 2, 10, 1_000, 1)
        .await
        .unwrap();
    assert!(create_monitor(&pool, tenant.id, network.id, "now allowed")
        .await
        .is_some());

    support::cleanup_tenant(&pool, tenant.id).await;
    support::cleanup_network(&pool, network.id).await;
}

#[tokio::test]
#[ignore]
async fn test_fallback_max_applies_without_limits_row() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let network = support::seed_network(&pool).await;

    // No tenant_limits row: the caller-supplied fallback is the ceiling
    let first = Monitor::create(
        &pool,
        CreateMonitor {
            tenant_id: tenant.id,
            network_id: network.id,
            name: "only one".to_string(),
            addresses: watch_addresses(),
            config: json!({}),
        },
        1,
    )
    .await
    .unwrap();
    assert!(first.is_some());

    let second = Monitor::create(
        &pool,
        CreateMonitor {
            tenant_id: tenant.id,
            network_id: network.id,
            name: "too many".to_string(),
            addresses: watch_addresses(),
            config: json!({}),
        },
        1,
    )
    .await
    .unwrap();
    assert!(second.is_none());

    support::cleanup_tenant(&pool, tenant.id).await;
    support::cleanup_network(&pool, network.id).await;
}

#[tokio::test]
#[ignore]
async fn test_list_filters_and_count() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let network_a = support::seed_network(&pool).await;
    let network_b = support::seed_network(&pool).await;

    create_monitor(&pool, tenant.id, network_a.id, "running").await.unwrap();
    let paused = create_monitor(&pool, tenant.id, network_a.id, "paused").await.unwrap();
    create_monitor(&pool, tenant.id, network_b.id, "elsewhere").await.unwrap();

    Monitor::update(
        &pool,
        paused.id,
        tenant.id,
        UpdateMonitor {
            paused: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    let on_network_a = MonitorFilter {
        network_id: Some(network_a.id),
        paused: None,
    };
    assert_eq!(
        Monitor::count_by_tenant(&pool, tenant.id, on_network_a).await.unwrap(),
        2
    );

    let only_paused = MonitorFilter {
        network_id: None,
        paused: Some(true),
    };
    let listed = Monitor::list_by_tenant(&pool, tenant.id, only_paused, 10, 0)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, paused.id);

    let everything = MonitorFilter::default();
    assert_eq!(
        Monitor::count_by_tenant(&pool, tenant.id, everything).await.unwrap(),
        3
    );

    support::cleanup_tenant(&pool, tenant.id).await;
    support::cleanup_network(&pool, network_a.id).await;
    support::cleanup_network(&pool, network_b.id).await;
}

#[tokio::test]
#[ignore]
async fn test_update_merges_config() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let network = support::seed_network(&pool).await;

    let monitor = Monitor::create(
        &pool,
        CreateMonitor {
            tenant_id: tenant.id,
            network_id: network.id,
            name: "configured".to_string(),
            addresses: watch_addresses(),
            config: json!({"confirmations": 3}),
        },
        100,
    )
    .await
    .unwrap()
    .unwrap();

    let updated = Monitor::update(
        &pool,
        monitor.id,
        tenant.id,
        UpdateMonitor {
            name: Some("reconfigured".to_string()),
            config: Some(json!({"include_internal": true})),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .expect("update returned no monitor");

    assert_eq!(updated.name, "reconfigured");
    assert_eq!(updated.config["confirmations"], 3);
    assert_eq!(updated.config["include_internal"], true);

    support::cleanup_tenant(&pool, tenant.id).await;
    support::cleanup_network(&pool, network.id).await;
}

#[tokio::test]
#[ignore]
async fn test_tenant_isolation() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let other = support::seed_tenant(&pool).await;
    let network = support::seed_network(&pool).await;

    let monitor = create_monitor(&pool, tenant.id, network.id, "guarded")
        .await
        .unwrap();

    // Another tenant cannot see, change, or delete it
    assert!(Monitor::find_by_id_and_tenant(&pool, monitor.id, other.id)
        .await
        .unwrap()
        .is_none());
    assert!(Monitor::update(&pool, monitor.id, other.id, UpdateMonitor::default())
        .await
        .unwrap()
        .is_none());
    assert!(!Monitor::delete(&pool, monitor.id, other.id).await.unwrap());

    // The owner can
    assert!(Monitor::delete(&pool, monitor.id, tenant.id).await.unwrap());
    assert!(!Monitor::delete(&pool, monitor.id, tenant.id).await.unwrap());

    support::cleanup_tenant(&pool, tenant.id).await;
    support::cleanup_tenant(&pool, other.id).await;
    support::cleanup_network(&pool, network.id).await;
}
