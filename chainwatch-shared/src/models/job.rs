/// Background job model and database operations
///
/// Jobs are a Postgres-backed work queue shared by the API (producer) and
/// the worker (consumer). The API enqueues a row and returns immediately;
/// workers claim due rows with `FOR UPDATE SKIP LOCKED` so several worker
/// processes can poll the same table without double-claiming.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE jobs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     kind VARCHAR(50) NOT NULL,
///     payload JSONB NOT NULL DEFAULT '{}',
///     status TEXT NOT NULL DEFAULT 'queued',
///     attempts INT NOT NULL DEFAULT 0,
///     max_attempts INT NOT NULL DEFAULT 5,
///     run_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     claimed_at TIMESTAMPTZ,
///     claimed_by VARCHAR(100),
///     finished_at TIMESTAMPTZ,
///     last_error TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE INDEX idx_jobs_queued ON jobs (run_at) WHERE status = 'queued';
/// ```
///
/// # Lifecycle
///
/// ```text
/// queued --claim--> running --success--> succeeded
///   ^                  |
///   |                  fail, attempts < max_attempts (requeued with backoff)
///   +------------------+
///                      |
///                      fail, attempts >= max_attempts
///                      v
///                    failed
/// ```
///
/// Attempts are counted at claim time, so a job that keeps crashing its
/// worker still converges on `failed` once `max_attempts` claims happened.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Well-known job kinds
///
/// The API enqueues these names and the worker registers a handler per
/// name, so both sides share the constants instead of string literals.
pub mod kinds {
    /// Re-scan a monitor's addresses against its network
    pub const MONITOR_SYNC: &str = "monitor_sync";

    /// Prune audit log entries past the retention window
    pub const AUDIT_SWEEP: &str = "audit_sweep";

    /// Deliver a test payload to a webhook trigger
    pub const WEBHOOK_TEST: &str = "webhook_test";
}

/// Job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a worker (or waiting out a retry backoff)
    #[sqlx(rename = "queued")]
    Queued,
    /// Claimed by a worker and executing
    #[sqlx(rename = "running")]
    Running,
    /// Finished successfully
    #[sqlx(rename = "succeeded")]
    Succeeded,
    /// Exhausted its attempts
    #[sqlx(rename = "failed")]
    Failed,
}

impl JobStatus {
    /// Returns the status as a string slice
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Parses a status from its string form
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "succeeded" => Some(JobStatus::Succeeded),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// True once the job will never run again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// One queued unit of background work
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    /// Unique job ID (returned to API callers that enqueued it)
    pub id: Uuid,

    /// Handler name, one of [`kinds`]
    pub kind: String,

    /// Handler-specific input
    pub payload: JsonValue,

    /// Current status ("queued", "running", "succeeded", "failed")
    pub status: String,

    /// Claims so far, incremented when a worker picks the job up
    pub attempts: i32,

    /// Claim budget before the job is parked as failed
    pub max_attempts: i32,

    /// Earliest time a worker may claim the job
    pub run_at: DateTime<Utc>,

    /// When the current (or last) claim happened
    pub claimed_at: Option<DateTime<Utc>>,

    /// Identity of the claiming worker process
    pub claimed_by: Option<String>,

    /// When the job reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,

    /// Error message from the most recent failed attempt
    pub last_error: Option<String>,

    /// When the job was enqueued
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Returns the status as a typed enum
    pub fn get_status(&self) -> Option<JobStatus> {
        JobStatus::from_str(&self.status)
    }

    /// Enqueues a job eligible to run immediately
    pub async fn enqueue(pool: &PgPool, kind: &str, payload: JsonValue) -> Result<Self, sqlx::Error> {
        Self::enqueue_at(pool, kind, payload, Utc::now()).await
    }

    /// Enqueues a job that becomes eligible at `run_at`
    pub async fn enqueue_at(
        pool: &PgPool,
        kind: &str,
        payload: JsonValue,
        run_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (kind, payload, run_at)
            VALUES ($1, $2, $3)
            RETURNING id, kind, payload, status, attempts, max_attempts, run_at,
                      claimed_at, claimed_by, finished_at, last_error,
                      created_at, updated_at
            "#,
        )
        .bind(kind)
        .bind(payload)
        .bind(run_at)
        .fetch_one(pool)
        .await?;

        Ok(job)
    }

    /// Claims up to `limit` due jobs for `worker_id`
    ///
    /// Due means queued with `run_at` in the past. Rows locked by a
    /// concurrent claimer are skipped rather than waited on, and the
    /// attempt counter is bumped as part of the claim.
    pub async fn claim_batch(
        pool: &PgPool,
        worker_id: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            WITH due AS (
                SELECT id
                FROM jobs
                WHERE status = 'queued' AND run_at <= NOW()
                ORDER BY run_at ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            UPDATE jobs
            SET status = 'running',
                attempts = jobs.attempts + 1,
                claimed_at = NOW(),
                claimed_by = $1,
                updated_at = NOW()
            FROM due
            WHERE jobs.id = due.id
            RETURNING jobs.id, jobs.kind, jobs.payload, jobs.status, jobs.attempts,
                      jobs.max_attempts, jobs.run_at, jobs.claimed_at, jobs.claimed_by,
                      jobs.finished_at, jobs.last_error, jobs.created_at, jobs.updated_at
            "#,
        )
        .bind(worker_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(jobs)
    }

    /// Marks a running job as succeeded
    pub async fn mark_succeeded(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = 'succeeded',
                finished_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'running'
            RETURNING id, kind, payload, status, attempts, max_attempts, run_at,
                      claimed_at, claimed_by, finished_at, last_error,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(job)
    }

    /// Finds a job by ID
    ///
    /// Used by API callers polling a job they enqueued.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, kind, payload, status, attempts, max_attempts, run_at,
                   claimed_at, claimed_by, finished_at, last_error,
                   created_at, updated_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(job)
    }

    /// True if a job of `kind` is queued or running
    ///
    /// Lets recurring jobs (the audit sweep) be seeded exactly once
    /// instead of piling up a copy per worker restart.
    pub async fn has_pending(pool: &PgPool, kind: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM jobs WHERE kind = $1 AND status IN ('queued', 'running'))",
        )
        .bind(kind)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Records a failed attempt
    ///
    /// Requeues the job `backoff_secs` into the future while attempts
    /// remain, otherwise parks it as failed. A single statement so the
    /// requeue-or-fail decision cannot race with another writer.
    pub async fn mark_failed(
        pool: &PgPool,
        id: Uuid,
        error: &str,
        backoff_secs: u64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = CASE WHEN attempts >= max_attempts THEN 'failed' ELSE 'queued' END,
                finished_at = CASE WHEN attempts >= max_attempts THEN NOW() ELSE NULL END,
                run_at = CASE WHEN attempts >= max_attempts
                              THEN run_at
                              ELSE NOW() + make_interval(secs => $3) END,
                claimed_at = NULL,
                claimed_by = NULL,
                last_error = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'running'
            RETURNING id, kind, payload, status, attempts, max_attempts, run_at,
                      claimed_at, claimed_by, finished_at, last_error,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(backoff_secs as f64)
        .fetch_optional(pool)
        .await?;

        Ok(job)
    }
}

/// Retry delay for a job that has failed `attempts` times
///
/// Doubles from one minute per failed attempt and caps at one hour.
pub fn retry_backoff_secs(attempts: i32) -> u64 {
    let exponent = (attempts.max(1) - 1).min(20) as u32;
    (60u64 << exponent).min(3600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_as_str() {
        assert_eq!(JobStatus::Queued.as_str(), "queued");
        assert_eq!(JobStatus::Running.as_str(), "running");
        assert_eq!(JobStatus::Succeeded.as_str(), "succeeded");
        assert_eq!(JobStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_job_status_from_str() {
        assert_eq!(JobStatus::from_str("queued"), Some(JobStatus::Queued));
        assert_eq!(JobStatus::from_str("running"), Some(JobStatus::Running));
        assert_eq!(JobStatus::from_str("succeeded"), Some(JobStatus::Succeeded));
        assert_eq!(JobStatus::from_str("failed"), Some(JobStatus::Failed));
        assert_eq!(JobStatus::from_str("cancelled"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_retry_backoff_doubles_per_attempt() {
        assert_eq!(retry_backoff_secs(1), 60);
        assert_eq!(retry_backoff_secs(2), 120);
        assert_eq!(retry_backoff_secs(3), 240);
        assert_eq!(retry_backoff_secs(4), 480);
        assert_eq!(retry_backoff_secs(5), 960);
    }

    #[test]
    fn test_retry_backoff_caps_at_one_hour() {
        assert_eq!(retry_backoff_secs(7), 3600);
        assert_eq!(retry_backoff_secs(50), 3600);
    }

    #[test]
    fn test_retry_backoff_handles_degenerate_attempts() {
        // A zero or negative count behaves like the first failure.
        assert_eq!(retry_backoff_secs(0), 60);
        assert_eq!(retry_backoff_secs(-3), 60);
    }

    // Integration tests for database operations are in tests/models/job_tests.rs
}
