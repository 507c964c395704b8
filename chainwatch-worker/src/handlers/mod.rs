/// Job handler contract and registry
///
/// Each background job kind has exactly one handler. The runner looks a
/// handler up by `kind()` and calls `run` with the claimed row; the
/// returned Result decides whether the job is acked as succeeded or sent
/// back through the retry path.
///
/// # Handler Contract
///
/// Handlers must be idempotent. A job can be claimed again after a worker
/// crash mid-run, so "already done" has to come back as success, not an
/// error. Payloads are rows from the queue, not trusted input: handlers
/// re-validate what they need and treat references to since-deleted rows
/// as a clean no-op.
mod audit_sweep;
mod monitor_sync;

pub use audit_sweep::AuditSweepHandler;
pub use monitor_sync::MonitorSyncHandler;
pub use webhook_test::WebhookTestHandler;

use async_trait::async_trait;
use chainwatch_shared::models::job::Job;
use chainwatch_shared::redis::Cache;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Errors a job handler can produce
///
/// All variants route through the same retry path; the distinction is for
/// the `last_error` column and the logs.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The payload did not parse into what the handler expects
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Outbound delivery failed (transport error or non-2xx response)
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The job cannot succeed in its current state
    #[error("{0}")]
    Failed(String),
}

impl From<reqwest::Error> for JobError {
    fn from(err: reqwest::Error) -> Self {
        JobError::Delivery(err.to_string())
    }
}

/// Shared resources handed to every handler
#[derive(Clone)]
pub struct JobContext {
    /// Database pool (the same pool the runner claims from)
    pub db: PgPool,

    /// Cache handle, present when Redis is configured
    pub cache: Option<Cache>,

    /// Outbound HTTP client for webhook deliveries
    pub http: reqwest::Client,
}

impl JobContext {
    /// Creates a context with a delivery-appropriate HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(db: PgPool, cache: Option<Cache>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("chainwatch-worker/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(JobContext { db, cache, http })
    }
}

/// Contract implemented by every job kind
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Job kind this handler serves, matched against `jobs.kind`
    fn kind(&self) -> &'static str;

    /// Executes one claimed job
    ///
    /// Returning `Err` sends the job through `mark_failed`: requeued with
    /// backoff while attempts remain, parked as failed after that.
    async fn run(&self, ctx: &JobContext, job: &Job) -> Result<(), JobError>;

    /// Cadence for self-rescheduling kinds
    ///
    /// When this returns `Some`, the runner seeds one pending row for the
    /// kind at startup and queues the next occurrence after each
    /// successful run.
    fn recurrence(&self) -> Option<chrono::Duration> {
        None
    }
}

/// The handlers a stock worker registers
///
/// `audit_retention_days` is the retention sweep's default window when a
/// job payload does not carry its own.
pub fn default_handlers(audit_retention_days: i64) -> Vec<Arc<dyn JobHandler>> {
    vec![
        Arc::new(MonitorSyncHandler),
        Arc::new(AuditSweepHandler::new(audit_retention_days)),
        Arc::new(WebhookTestHandler),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwatch_shared::models::job::kinds;

    #[test]
    fn test_default_handlers_cover_all_kinds() {
        let handlers = default_handlers(90);
        let served: Vec<&str> = handlers.iter().map(|h| h.kind()).collect();

        assert!(served.contains(&kinds::MONITOR_SYNC));
        assert!(served.contains(&kinds::AUDIT_SWEEP));
        assert!(served.contains(&kinds::WEBHOOK_TEST));
        assert_eq!(served.len(), 3);
    }

    #[test]
    fn test_only_the_sweep_recurs() {
        for handler in default_handlers(90) {
            let recurs = handler.recurrence().is_some();
            assert_eq!(recurs, handler.kind() == kinds::AUDIT_SWEEP);
        }
    }

    #[test]
    fn test_job_error_messages() {
        let err = JobError::InvalidPayload("missing monitor_id".to_string());
        assert_eq!(err.to_string(), "invalid payload: missing monitor_id");

        let err = JobError::Delivery("endpoint returned 503".to_string());
        assert_eq!(err.to_string(), "delivery failed: endpoint returned 503");

        let err = JobError::Failed("network 'ethereum' is inactive".to_string());
        assert_eq!(err.to_string(), "network 'ethereum' is inactive");
    }
}
