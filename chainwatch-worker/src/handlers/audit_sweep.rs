/// Audit retention sweep
///
/// Deletes `audit_log` rows older than the retention window. The kind is
/// recurring: the runner keeps one pending sweep scheduled a day out, and
/// operators can enqueue an extra run with a `retention_days` override in
/// the payload (the override applies to that run only).
use async_trait::async_trait;
use chainwatch_shared::models::audit::AuditEntry;
use chainwatch_shared::models::job::{kinds, Job};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::info;

use super::{JobContext, JobError, JobHandler};

#[derive(Debug, Deserialize)]
pub struct AuditSweepPayload {
    /// Retention window override in days
    #[serde(default)]
    pub retention_days: Option<i64>,
}

pub struct AuditSweepHandler {
    retention_days: i64,
}

impl AuditSweepHandler {
    /// Creates a sweep handler with the given default retention window
    pub fn new(retention_days: i64) -> Self {
        AuditSweepHandler { retention_days }
    }
}

#[async_trait]
impl JobHandler for AuditSweepHandler {
    fn kind(&self) -> &'static str {
        kinds::AUDIT_SWEEP
    }

    async fn run(&self, ctx: &JobContext, job: &Job) -> Result<(), JobError> {
        let payload: AuditSweepPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| JobError::InvalidPayload(e.to_string()))?;

        // Floor of one day: a zero or negative window would empty the
        // whole trail.
        let retention_days = payload.retention_days.unwrap_or(self.retention_days).max(1);
        let cutoff = Utc::now() - Duration::days(retention_days);

        let purged = AuditEntry::purge_older_than(&ctx.db, cutoff).await?;
        info!(purged, retention_days, "Audit retention sweep completed");

        Ok(())
    }

    fn recurrence(&self) -> Option<Duration> {
        Some(Duration::hours(24))
    }
}
