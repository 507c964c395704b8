use chainwatch_shared::auth::api_key::{extract_last_four, extract_prefix, verify_api_key};
use chainwatch_shared::models::api_key::{ApiKey, CreateApiKey};
use chrono::{Duration, Utc};

use crate::support;

async fn issue_key(
    pool: &sqlx::PgPool,
    tenant_id: uuid::Uuid,
    user_id: uuid::Uuid,
    name: &str,
    expires_at: Option<chrono::DateTime<Utc>>,
) -> (ApiKey, String) {
    ApiKey::create(
        pool,
        CreateApiKey {
            tenant_id,
            user_id,
            name: name.to_string(),
            scopes: vec!["monitors:read".to_string()],
            expires_at,
        },
    )
    .await
    .expect("Failed to create API key")
}

#[tokio::test]
#[ignore]
async fn test_create_returns_plaintext_and_stores_hash() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let user = support::seed_user(&pool, tenant.id).await;

    let (record, plaintext) = issue_key(&pool, tenant.id, user.id, "ci key", None).await;

    assert!(plaintext.starts_with("cwk_"));
    assert_eq!(plaintext.len(), 44);
    assert_eq!(record.key_prefix, extract_prefix(&plaintext));
    assert_eq!(record.last_four, extract_last_four(&plaintext));
    assert_ne!(record.key_hash, plaintext, "plaintext must never be stored");
    assert!(verify_api_key(&plaintext, &record.key_hash));
    assert_eq!(record.usage_count, 0);
    assert!(!record.revoked);
    assert!(record.last_used_at.is_none());

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_find_candidates_narrows_by_prefix_and_last_four() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let user = support::seed_user(&pool, tenant.id).await;

    let (first, first_plaintext) = issue_key(&pool, tenant.id, user.id, "first", None).await;
    let (_, second_plaintext) = issue_key(&pool, tenant.id, user.id, "second", None).await;

    let candidates = ApiKey::find_candidates(&pool, &first.key_prefix, &first.last_four)
        .await
        .unwrap();

    assert!(candidates.iter().any(|k| k.id == first.id));
    for candidate in &candidates {
        assert_eq!(candidate.key_prefix, first.key_prefix);
        assert_eq!(candidate.last_four, first.last_four);
    }

    // Only the matching key's hash verifies against the first plaintext
    let matching: Vec<_> = candidates
        .iter()
        .filter(|k| verify_api_key(&first_plaintext, &k.key_hash))
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].id, first.id);

    // The second key's plaintext never verifies against the first's hash
    assert!(!verify_api_key(&second_plaintext, &first.key_hash));

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_revoked_keys_are_not_candidates() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let user = support::seed_user(&pool, tenant.id).await;

    let (record, _) = issue_key(&pool, tenant.id, user.id, "short lived", None).await;

    let revoked = ApiKey::revoke(&pool, record.id, tenant.id).await.unwrap();
    assert!(revoked);

    let candidates = ApiKey::find_candidates(&pool, &record.key_prefix, &record.last_four)
        .await
        .unwrap();
    assert!(candidates.iter().all(|k| k.id != record.id));

    // Revoking twice reports that nothing changed
    assert!(!ApiKey::revoke(&pool, record.id, tenant.id).await.unwrap());

    // Revoking under the wrong tenant never succeeds
    let other = support::seed_tenant(&pool).await;
    let (second, _) = issue_key(&pool, tenant.id, user.id, "guarded", None).await;
    assert!(!ApiKey::revoke(&pool, second.id, other.id).await.unwrap());

    support::cleanup_tenant(&pool, tenant.id).await;
    support::cleanup_tenant(&pool, other.id).await;
}

#[tokio::test]
#[ignore]
async fn test_record_usage_increments_counter() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let user = support::seed_user(&pool, tenant.id).await;

    let (record, _) = issue_key(&pool, tenant.id, user.id, "busy key", None).await;

    ApiKey::record_usage(&pool, record.id).await.unwrap();
    ApiKey::record_usage(&pool, record.id).await.unwrap();

    let reloaded = ApiKey::find_by_id_and_tenant(&pool, record.id, tenant.id)
        .await
        .unwrap()
        .expect("key missing after usage");
    assert_eq!(reloaded.usage_count, 2);
    assert!(reloaded.last_used_at.is_some());

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_expiry_and_usability_flags() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let user = support::seed_user(&pool, tenant.id).await;

    let (expired, _) = issue_key(
        &pool,
        tenant.id,
        user.id,
        "stale",
        Some(Utc::now() - Duration::hours(1)),
    )
    .await;
    assert!(expired.is_expired());
    assert!(!expired.is_usable());

    let (fresh, _) = issue_key(
        &pool,
        tenant.id,
        user.id,
        "fresh",
        Some(Utc::now() + Duration::days(30)),
    )
    .await;
    assert!(!fresh.is_expired());
    assert!(fresh.is_usable());

    let (forever, _) = issue_key(&pool, tenant.id, user.id, "no expiry", None).await;
    assert!(!forever.is_expired());
    assert!(forever.is_usable());

    ApiKey::revoke(&pool, forever.id, tenant.id).await.unwrap();
    let reloaded = ApiKey::find_by_id_and_tenant(&pool, forever.id, tenant.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!reloaded.is_usable(), "revoked keys are never usable");

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_list_by_tenant_newest_first() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let user = support::seed_user(&pool, tenant.id).await;

    let (older, _) = issue_key(&pool, tenant.id, user.id, "older", None).await;
    // Separate the timestamps so the ordering cannot tie
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let (newer, _) = issue_key(&pool, tenant.id, user.id, "newer", None).await;

    let listed = ApiKey::list_by_tenant(&pool, tenant.id).await.unwrap();
    assert_eq!(listed.len(), 2);

    let older_pos = listed.iter().position(|k| k.id == older.id).unwrap();
    let newer_pos = listed.iter().position(|k| k.id == newer.id).unwrap();
    assert!(newer_pos < older_pos, "listing should be newest first");

    support::cleanup_tenant(&pool, tenant.id).await;
}
