use chainwatch_shared::models::user::{CreateUser, UpdateUser, User, UserRole};
use uuid::Uuid;

use crate::support;

#[tokio::test]
#[ignore]
async fn test_create_lowercases_email() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;

    let marker = Uuid::new_v4();
    let user = User::create(
        &pool,
        CreateUser {
            tenant_id: tenant.id,
            email: format!("Mixed.Case-{}@Example.COM", marker),
            password_hash: "argon2id-placeholder".to_string(),
            display_name: Some("Casey".to_string()),
            role: UserRole::Owner,
        },
    )
    .await
    .unwrap();

    assert_eq!(user.email, format!("mixed.case-{}@example.com", marker));
    assert_eq!(user.get_role(), Some(UserRole::Owner));
    assert!(user.active);
    assert!(!user.is_superuser);
    assert!(user.last_login_at.is_none());

    // Lookup is case-insensitive as well
    let found = User::find_by_email(&pool, &format!("MIXED.CASE-{}@EXAMPLE.com", marker))
        .await
        .unwrap()
        .expect("user missing by email");
    assert_eq!(found.id, user.id);

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_rejected() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let user = support::seed_user(&pool, tenant.id).await;

    let result = User::create(
        &pool,
        CreateUser {
            tenant_id: tenant.id,
            email: user.email.clone(),
            password_hash: "argon2id-placeholder".to_string(),
            display_name: None,
            role: UserRole::Member,
        },
    )
    .await;

    assert!(result.is_err(), "Duplicate email should violate the unique index");

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_update_role_and_deactivate() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let user = support::seed_user(&pool, tenant.id).await;

    let updated = User::update(
        &pool,
        user.id,
        UpdateUser {
            role: Some(UserRole::Admin),
            active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .expect("update returned no user");

    assert_eq!(updated.get_role(), Some(UserRole::Admin));
    assert!(!updated.active);

    // Some(None) clears the display name
    let updated = User::update(
        &pool,
        user.id,
        UpdateUser {
            display_name: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert!(updated.display_name.is_none());

    assert!(User::update(&pool, Uuid::new_v4(), UpdateUser::default())
        .await
        .unwrap()
        .is_none());

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_update_last_login() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let user = support::seed_user(&pool, tenant.id).await;

    assert!(user.last_login_at.is_none());

    let touched = User::update_last_login(&pool, user.id).await.unwrap();
    assert!(touched);

    let reloaded = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(reloaded.last_login_at.is_some());

    assert!(!User::update_last_login(&pool, Uuid::new_v4()).await.unwrap());

    support::cleanup_tenant(&pool, tenant.id).await;
}

#[tokio::test]
#[ignore]
async fn test_list_and_count_scoped_to_tenant() {
    let pool = support::test_pool().await;
    let tenant = support::seed_tenant(&pool).await;
    let other = support::seed_tenant(&pool).await;

    let ours = support::seed_user(&pool, tenant.id).await;
    support::seed_user(&pool, other.id).await;

    assert_eq!(User::count_by_tenant(&pool, tenant.id).await.unwrap(), 1);

    let listed = User::list_by_tenant(&pool, tenant.id, 10, 0).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, ours.id);

    support::cleanup_tenant(&pool, tenant.id).await;
    support::cleanup_tenant(&pool, other.id).await;
}
