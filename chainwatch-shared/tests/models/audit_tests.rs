use chainwatch_shared::models::audit::{AuditEntry, CreateAuditEntry};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::support;

fn entry_for(tenant_id: Uuid, actor_id: Option<Uuid>, action: &str) -> CreateAuditEntry {
    CreateAuditEntry {
        tenant_id,
        actor_id,
        action: action.to_string(),
        resource_type: "monitor".to_string(),
        resource_id: Some(Uuid::new_v4().to_string()),
        target_tenant_id: None,
        details: json!({"source": "model test"}),
        client_ip: Some("203.0.113.7".to_string()),
        user_agent: Some("curl/8.4".to_string()),
        request_id: Some(Uuid::new_v4().to_string()),
    }
}

#[tokio::test]
#[ignore]
async fn test_record_and_list_with_action_filter() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let user = support::seed_user(&pool, tenant.id).await;

    let created = AuditEntry::record(&pool, entry_for(tenant.id, Some(user.id), "monitor.create"))
        .await
        .unwrap();
    AuditEntry::record(&pool, entry_for(tenant.id, Some(user.id), "monitor.delete"))
        .await
        .unwrap();

    assert_eq!(created.action, "monitor.create");
    assert_eq!(created.actor_id, Some(user.id));

    let all = AuditEntry::list_by_tenant(&pool, tenant.id, None, 10, 0)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let creates = AuditEntry::list_by_tenant(&pool, tenant.id, Some("monitor.create"), 10, 0)
        .await
        .unwrap();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].id, created.id);

    assert_eq!(
        AuditEntry::count_by_tenant(&pool, tenant.id, None).await.unwrap(),
        2
    );
    assert_eq!(
        AuditEntry::count_by_tenant(&pool, tenant.id, Some("monitor.delete"))
            .await
            .unwrap(),
        1
    );

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_trail_is_scoped_to_tenant() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let other = support::seed_tenant(&pool).await;

    AuditEntry::record(&pool, entry_for(tenant.id, None, "tenant.suspend"))
        .await
        .unwrap();

    let theirs = AuditEntry::list_by_tenant(&pool, other.id, None, 10, 0)
        .await
        .unwrap();
    assert!(theirs.is_empty());

    assert_eq!(
        AuditEntry::count_by_tenant(&pool, other.id, None).await.unwrap(),
        0
    );

    support::cleanup_tenant(&pool, tenant.id).await;
    support::cleanup_tenant(&pool, other.id).await;
}

#[tokio::test]
#[ignore]
async fn test_purge_removes_only_old_entries() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;

    let old = AuditEntry::record(&pool, entry_for(tenant.id, None, "monitor.update"))
        .await
        .unwrap();
    let fresh = AuditEntry::record(&pool, entry_for(tenant.id, None, "monitor.update"))
        .await
        .unwrap();

    // Backdate one entry past the retention horizon
    sqlx::query("UPDATE audit_log SET created_at = NOW() - INTERVAL '90 days' WHERE id = $1")
        .bind(old.id)
        .execute(&pool)
        .await
        .unwrap();

    let removed = AuditEntry::purge_older_than(&pool, Utc::now() - Duration::days(30))
        .await
        .unwrap();
    assert!(removed >= 1);

    let remaining = AuditEntry::list_by_tenant(&pool, tenant.id, None, 10, 0)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, fresh.id);

    support::cleanup_tenant(&pool, tenant.id).await;
}
