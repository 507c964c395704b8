use chainwatch_shared::models::network::{CreateNetwork, Network, UpdateNetwork};
use uuid::Uuid;

use crate::support;

#[tokio::test]
#[ignore]
async fn test_create_and_find_network() {
    let pool = support::test_pool().await;
    let network = support::seed_network(&pool).await;

    assert!(network.active);
    assert_eq!(network.chain_id, 1337);
    assert_eq!(network.block_time_ms, 12_000);

    let by_id = Network::find_by_id(&pool, network.id)
        .await
        .unwrap()
        .expect("network missing by id");
    assert_eq!(by_id.slug, network.slug);

    let by_slug = Network::find_by_slug(&pool, &network.slug)
        .await
        .unwrap()
        .expect("network missing by slug");
    assert_eq!(by_slug.id, network.id);

    assert!(Network::find_by_id(&pool, Uuid::new_v4()).await.unwrap().is_none());

    support::cleanup_network(&pool, network.id).await;
}

#[tokio::test]
#[ignore]
async fn test_duplicate_slug_rejected() {
    let pool = support::test_pool().await;
    let network = support::seed_network(&pool).await;

    let result = Network::create(
        &pool,
        CreateNetwork {
            slug: network.slug.clone(),
            name: "Copycat".to_string(),
            chain_id: 99,
            rpc_url: "http://localhost:9999".to_string(),
            block_time_ms: 1_000,
        },
    )
    .await;

    assert!(result.is_err(), "Duplicate slug should violate the unique index");

    support::cleanup_network(&pool, network.id).await;
}

#[tokio::test]
#[ignore]
async fn test_deactivated_networks_hidden_from_active_list() {
    let pool = support::test_pool().await;
    let network = support::seed_network(&pool).await;

    let active = Network::list_active(&pool).await.unwrap();
    assert!(active.iter().any(|n| n.id == network.id));

    let updated = Network::update(
        &pool,
        network.id,
        UpdateNetwork {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .expect("update returned no network");
    assert!(!updated.active);

    let active = Network::list_active(&pool).await.unwrap();
    assert!(active.iter().all(|n| n.id != network.id));

    // The full catalog still carries it
    let all = Network::list_all(&pool).await.unwrap();
    assert!(all.iter().any(|n| n.id == network.id));

    support::cleanup_network(&pool, network.id).await;
}

#[tokio::test]
#[ignore]
async fn test_update_fields() {
    let pool = support::test_pool().await;
    let network = support::seed_network(&pool).await;

    let updated = Network::update(
        &pool,
        network.id,
        UpdateNetwork {
            name: Some("Renamed Net".to_string()),
            rpc_url: Some("https://rpc.renamed.example".to_string()),
            block_time_ms: Some(2_000),
            active: None,
        },
    )
    .await
    .unwrap()
    .expect("update returned no network");

    assert_eq!(updated.name, "Renamed Net");
    assert_eq!(updated.rpc_url, "https://rpc.renamed.example");
    assert_eq!(updated.block_time_ms, 2_000);
    assert!(updated.active, "untouched fields keep their values");
    assert_eq!(updated.slug, network.slug, "the slug is immutable");

    assert!(Network::update(&pool, Uuid::new_v4(), UpdateNetwork::default())
        .await
        .unwrap()
        .is_none());

    support::cleanup_network(&pool, network.id).await;
}

#[tokio::test]
#[ignore]
async fn test_delete_network() {
    let pool = support::test_pool().await;
    let network = support::seed_network(&pool).await;

    assert!(Network::delete(&pool, network.id).await.unwrap());
    assert!(Network::find_by_id(&pool, network.id).await.unwrap().is_none());
    assert!(!Network::delete(&pool, network.id).await.unwrap());
}
