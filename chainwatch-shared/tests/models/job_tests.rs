use chainwatch_shared::models::job::{Job, JobStatus};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::support;

/// Claims with a wide limit and returns this test's job from the batch
async fn claim_own(pool: &sqlx::PgPool, worker_id: &str, job_id: Uuid) -> Job {
    let claimed = Job::claim_batch(pool, worker_id, 50)
        .await
        .expect("claim failed");
    claimed
        .into_iter()
        .find(|j| j.id == job_id)
        .expect("due job missing from the claimed batch")
}

#[tokio::test]
#[ignore]
async fn test_enqueue_and_find() {
    let pool = support::test_pool().await;

    let job = Job::enqueue_at(
        &pool,
        "model_test_noop",
        json!({"marker": 1}),
        Utc::now() + Duration::hours(1),
    )
    .await
    .unwrap();

    assert_eq!(job.status, "queued");
    assert_eq!(job.get_status(), Some(JobStatus::Queued));
    assert_eq!(job.attempts, 0);
    assert_eq!(job.max_attempts, 5);
    assert!(job.claimed_by.is_none());
    assert!(job.finished_at.is_none());

    let found = Job::find_by_id(&pool, job.id)
        .await
        .unwrap()
        .expect("job missing by id");
    assert_eq!(found.payload["marker"], 1);

    assert!(Job::find_by_id(&pool, Uuid::new_v4()).await.unwrap().is_none());

    support::cleanup_job(&pool, job.id).await;
}

#[tokio::test]
#[ignore]
async fn test_future_jobs_are_not_claimable() {
    let pool = support::test_pool().await;

    let job = Job::enqueue_at(
        &pool,
        "model_test_later",
        json!({}),
        Utc::now() + Duration::hours(1),
    )
    .await
    .unwrap();

    let claimed = Job::claim_batch(&pool, "worker-model-future", 50)
        .await
        .unwrap();
    assert!(claimed.iter().all(|j| j.id != job.id));

    let untouched = Job::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, "queued");
    assert_eq!(untouched.attempts, 0);

    support::cleanup_job(&pool, job.id).await;
}

#[tokio::test]
#[ignore]
async fn test_claim_marks_running_and_bumps_attempts() {
    let pool = support::test_pool().await;

    let job = Job::enqueue(&pool, "model_test_claim", json!({})).await.unwrap();

    let claimed = claim_own(&pool, "worker-model-claim", job.id).await;
    assert_eq!(claimed.status, "running");
    assert_eq!(claimed.get_status(), Some(JobStatus::Running));
    assert_eq!(claimed.attempts, 1);
    assert_eq!(claimed.claimed_by.as_deref(), Some("worker-model-claim"));
    assert!(claimed.claimed_at.is_some());

    // A running job cannot be claimed again
    let reclaim = Job::claim_batch(&pool, "worker-model-other", 50).await.unwrap();
    assert!(reclaim.iter().all(|j| j.id != job.id));

    support::cleanup_job(&pool, job.id).await;
}

#[tokio::test]
#[ignore]
async fn test_mark_succeeded_requires_running() {
    let pool = support::test_pool().await;

    let job = Job::enqueue(&pool, "model_test_succeed", json!({})).await.unwrap();

    // Not running yet, so there is nothing to acknowledge
    assert!(Job::mark_succeeded(&pool, job.id).await.unwrap().is_none());

    claim_own(&pool, "worker-model-succeed", job.id).await;

    let done = Job::mark_succeeded(&pool, job.id)
        .await
        .unwrap()
        .expect("running job should accept the ack");
    assert_eq!(done.status, "succeeded");
    assert!(done.finished_at.is_some());
    assert!(done.get_status().unwrap().is_terminal());

    // A second ack is a no-op
    assert!(Job::mark_succeeded(&pool, job.id).await.unwrap().is_none());

    support::cleanup_job(&pool, job.id).await;
}

#[tokio::test]
#[ignore]
async fn test_mark_failed_requeues_then_parks() {
    let pool = support::test_pool().await;

    let job = Job::enqueue(&pool, "model_test_fail", json!({})).await.unwrap();

    // Burn through every attempt with zero backoff so each requeue is
    // immediately claimable again
    for attempt in 1..=5 {
        let claimed = claim_own(&pool, "worker-model-fail", job.id).await;
        assert_eq!(claimed.attempts, attempt);

        let failed = Job::mark_failed(&pool, job.id, "boom", 0)
            .await
            .unwrap()
            .expect("running job should accept the failure");

        if attempt < 5 {
            assert_eq!(failed.status, "queued", "attempt {} should requeue", attempt);
            assert!(failed.claimed_by.is_none());
            assert!(failed.finished_at.is_none());
            assert_eq!(failed.last_error.as_deref(), Some("boom"));
        } else {
            assert_eq!(failed.status, "failed", "final attempt should park the job");
            assert!(failed.finished_at.is_some());
            assert!(failed.get_status().unwrap().is_terminal());
        }
    }

    support::cleanup_job(&pool, job.id).await;
}

#[tokio::test]
#[ignore]
async fn test_failed_job_backoff_delays_requeue() {
    let pool = support::test_pool().await;

    let job = Job::enqueue(&pool, "model_test_backoff", json!({})).await.unwrap();
    claim_own(&pool, "worker-model-backoff", job.id).await;

    let failed = Job::mark_failed(&pool, job.id, "transient", 300)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.status, "queued");
    assert!(
        failed.run_at > Utc::now() + Duration::seconds(200),
        "backoff should push run_at into the future"
    );

    // Not due yet, so no claimer picks it up
    let claimed = Job::claim_batch(&pool, "worker-model-backoff", 50).await.unwrap();
    assert!(claimed.iter().all(|j| j.id != job.id));

    support::cleanup_job(&pool, job.id).await;
}

#[tokio::test]
#[ignore]
async fn test_has_pending_tracks_lifecycle() {
    let pool = support::test_pool().await;

    let kind = format!("model-sweep-{}", &Uuid::new_v4().to_string()[..8]);
    assert!(!Job::has_pending(&pool, &kind).await.unwrap());

    let job = Job::enqueue(&pool, &kind, json!({})).await.unwrap();
    assert!(Job::has_pending(&pool, &kind).await.unwrap());

    // Running still counts as pending
    claim_own(&pool, "worker-model-sweep", job.id).await;
    assert!(Job::has_pending(&pool, &kind).await.unwrap());

    Job::mark_succeeded(&pool, job.id).await.unwrap().unwrap();
    assert!(!Job::has_pending(&pool, &kind).await.unwrap());

    support::cleanup_job(&pool, job.id).await;
}
