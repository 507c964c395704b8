/// Job polling and dispatch loop
///
/// One `JobRunner` polls the jobs table, claims due rows in batches, and
/// runs each job on its own tokio task, bounded by a semaphore. Outcomes
/// are written back through `mark_succeeded`/`mark_failed`; failures are
/// requeued with exponential backoff until the row's attempt budget is
/// spent.
///
/// Shutdown: cancel the token from [`JobRunner::shutdown_token`]. The
/// loop stops claiming, waits up to 30 seconds for in-flight jobs, then
/// returns.
use chainwatch_shared::models::job::{retry_backoff_secs, Job, JobStatus};
use chainwatch_shared::redis::Cache;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::handlers::{default_handlers, JobContext, JobHandler};

/// How long shutdown waits for in-flight jobs
const DRAIN_TIMEOUT_SECS: u64 = 30;

/// Runner tuning knobs
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Seconds to sleep when the queue comes back empty
    pub poll_interval_secs: u64,

    /// Maximum jobs claimed per poll
    pub batch_size: i64,

    /// Maximum jobs executing at once
    pub max_concurrent_jobs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            poll_interval_secs: 1,
            batch_size: 5,
            max_concurrent_jobs: 10,
        }
    }
}

/// The worker's claim/dispatch/ack loop
pub struct JobRunner {
    db: PgPool,
    ctx: JobContext,
    config: RunnerConfig,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    worker_id: String,
    limiter: Arc<Semaphore>,
    shutdown_token: CancellationToken,
}

impl JobRunner {
    /// Creates a runner with the stock handler registry
    ///
    /// # Errors
    ///
    /// Returns an error if the handler context cannot be built.
    pub fn new(
        db: PgPool,
        cache: Option<Cache>,
        config: RunnerConfig,
        audit_retention_days: i64,
    ) -> anyhow::Result<Self> {
        let ctx = JobContext::new(db.clone(), cache)?;

        let mut handlers: HashMap<String, Arc<dyn JobHandler>> = HashMap::new();
        for handler in default_handlers(audit_retention_days) {
            handlers.insert(handler.kind().to_string(), handler);
        }

        let limiter = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let worker_id = format!("worker-{}", Uuid::new_v4());

        Ok(JobRunner {
            db,
            ctx,
            config,
            handlers,
            worker_id,
            limiter,
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Registers (or replaces) a handler
    pub fn register_handler(&mut self, handler: Arc<dyn JobHandler>) {
        info!(kind = handler.kind(), "Registering job handler");
        self.handlers.insert(handler.kind().to_string(), handler);
    }

    /// Token external shutdown handlers cancel to stop the loop
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Identity recorded on rows this runner claims
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Runs the polling loop until shutdown
    ///
    /// # Errors
    ///
    /// Claim and ack errors are logged and retried, not returned; the
    /// Result exists for parity with the binary's error handling.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(
            worker_id = %self.worker_id,
            handlers = self.handlers.len(),
            "Job runner starting"
        );

        self.seed_recurring_jobs().await;

        loop {
            if self.shutdown_token.is_cancelled() {
                self.drain().await;
                break;
            }

            // Claim no more than we can run right now, so rows never sit
            // in 'running' waiting for a permit.
            let available = self.limiter.available_permits();
            if available == 0 {
                sleep(Duration::from_millis(100)).await;
                continue;
            }

            let limit = self.config.batch_size.min(available as i64);
            let jobs = match Job::claim_batch(&self.db, &self.worker_id, limit).await {
                Ok(jobs) => jobs,
                Err(e) => {
                    error!(error = %e, "Failed to claim jobs");
                    self.wait_poll_interval().await;
                    continue;
                }
            };

            if jobs.is_empty() {
                self.wait_poll_interval().await;
                continue;
            }

            for job in jobs {
                self.dispatch(job).await;
            }
        }

        Ok(())
    }

    /// Ensures every recurring kind has a pending row
    ///
    /// Covers first boot and a lost reschedule (worker died between the
    /// ack and the follow-up enqueue).
    async fn seed_recurring_jobs(&self) {
        for handler in self.handlers.values() {
            if handler.recurrence().is_none() {
                continue;
            }

            match Job::has_pending(&self.db, handler.kind()).await {
                Ok(true) => {}
                Ok(false) => match Job::enqueue(&self.db, handler.kind(), serde_json::json!({}))
                    .await
                {
                    Ok(job) => {
                        info!(job_id = %job.id, kind = handler.kind(), "Seeded recurring job")
                    }
                    Err(e) => {
                        error!(error = %e, kind = handler.kind(), "Failed to seed recurring job")
                    }
                },
                Err(e) => {
                    error!(error = %e, kind = handler.kind(), "Failed to check recurring schedule")
                }
            }
        }
    }

    /// Sleeps one poll interval, cut short by shutdown
    async fn wait_poll_interval(&self) {
        tokio::select! {
            _ = sleep(Duration::from_secs(self.config.poll_interval_secs)) => {}
            _ = self.shutdown_token.cancelled() => {}
        }
    }

    /// Waits for in-flight jobs to finish, up to the drain timeout
    async fn drain(&self) {
        info!("Shutdown requested, draining in-flight jobs");

        let all = self.config.max_concurrent_jobs as u32;
        match tokio::time::timeout(
            Duration::from_secs(DRAIN_TIMEOUT_SECS),
            self.limiter.acquire_many(all),
        )
        .await
        {
            Ok(Ok(_all_permits)) => info!("Job runner drained"),
            Ok(Err(_)) => {}
            Err(_) => warn!(
                still_running =
                    self.config.max_concurrent_jobs - self.limiter.available_permits(),
                "Drain timeout hit with jobs still running"
            ),
        }

        info!("Job runner stopped");
    }

    /// Hands a claimed job to its handler on a fresh task
    async fn dispatch(&self, job: Job) {
        let handler = match self.handlers.get(&job.kind) {
            Some(handler) => handler.clone(),
            None => {
                error!(job_id = %job.id, kind = %job.kind, "No handler for job kind");
                let message = format!("no handler for kind '{}'", job.kind);
                let backoff = retry_backoff_secs(job.attempts);
                if let Err(e) = Job::mark_failed(&self.db, job.id, &message, backoff).await {
                    error!(error = %e, job_id = %job.id, "Failed to record job failure");
                }
                return;
            }
        };

        // Never blocks: the claim limit was capped by available_permits
        // in the same loop iteration, and only this loop takes permits.
        let permit = match self.limiter.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        let db = self.db.clone();
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            run_one(&db, &ctx, handler, job).await;
            drop(permit);
        });
    }
}

/// Executes one claimed job and records the outcome
async fn run_one(db: &PgPool, ctx: &JobContext, handler: Arc<dyn JobHandler>, job: Job) {
    info!(
        job_id = %job.id,
        kind = %job.kind,
        attempt = job.attempts,
        "Executing job"
    );

    match handler.run(ctx, &job).await {
        Ok(()) => {
            match Job::mark_succeeded(db, job.id).await {
                Ok(Some(_)) => info!(job_id = %job.id, kind = %job.kind, "Job succeeded"),
                Ok(None) => {
                    warn!(job_id = %job.id, "Job was not running when acked, leaving as-is")
                }
                Err(e) => error!(error = %e, job_id = %job.id, "Failed to ack job success"),
            }
            reschedule_recurring(db, handler.as_ref(), &job).await;
        }
        Err(e) => {
            let backoff = retry_backoff_secs(job.attempts);
            match Job::mark_failed(db, job.id, &e.to_string(), backoff).await {
                Ok(Some(updated)) if updated.get_status() == Some(JobStatus::Failed) => {
                    error!(
                        job_id = %job.id,
                        kind = %job.kind,
                        attempts = updated.attempts,
                        error = %e,
                        "Job failed permanently"
                    );
                }
                Ok(Some(_)) => {
                    warn!(
                        job_id = %job.id,
                        kind = %job.kind,
                        attempt = job.attempts,
                        backoff_secs = backoff,
                        error = %e,
                        "Job failed, requeued"
                    );
                }
                Ok(None) => {
                    warn!(job_id = %job.id, "Job was not running when failure was recorded")
                }
                Err(mark_err) => {
                    error!(error = %mark_err, job_id = %job.id, "Failed to record job failure")
                }
            }
        }
    }
}

/// Queues the next occurrence of a recurring kind after a successful run
///
/// Guarded by `has_pending` so a crash-and-reclaim cannot stack copies.
async fn reschedule_recurring(db: &PgPool, handler: &dyn JobHandler, job: &Job) {
    let Some(every) = handler.recurrence() else {
        return;
    };

    match Job::has_pending(db, &job.kind).await {
        Ok(true) => {}
        Ok(false) => {
            let run_at = Utc::now() + every;
            match Job::enqueue_at(db, &job.kind, serde_json::json!({}), run_at).await {
                Ok(next) => info!(
                    job_id = %next.id,
                    kind = %job.kind,
                    run_at = %next.run_at,
                    "Scheduled next recurring job"
                ),
                Err(e) => {
                    error!(error = %e, kind = %job.kind, "Failed to schedule recurring job")
                }
            }
        }
        Err(e) => error!(error = %e, kind = %job.kind, "Failed to check recurring schedule"),
    }
}
