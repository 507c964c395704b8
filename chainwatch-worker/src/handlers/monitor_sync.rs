/// Monitor sync job
///
/// Enqueued by `POST /api/v1/monitors/{id}/sync`. A sync re-checks that
/// the monitor is runnable (exists, not paused, on an active network) and
/// drops its cache entries so the next reader rebuilds them from the row.
/// Deleted and paused monitors are a clean no-op.
use async_trait::async_trait;
use chainwatch_shared::models::job::{kinds, Job};
use chainwatch_shared::models::monitor::Monitor;
use chainwatch_shared::models::network::Network;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{JobContext, JobError, JobHandler};

/// Payload shape the API enqueues
#[derive(Debug, Deserialize)]
pub struct MonitorSyncPayload {
    pub monitor_id: Uuid,
    pub tenant_id: Uuid,

    /// User that asked for the sync, carried into the log line
    #[serde(default)]
    pub requested_by: Option<Uuid>,
}

pub struct MonitorSyncHandler;

#[async_trait]
impl JobHandler for MonitorSyncHandler {
    fn kind(&self) -> &'static str {
        kinds::MONITOR_SYNC
    }

    async fn run(&self, ctx: &JobContext, job: &Job) -> Result<(), JobError> {
        let payload: MonitorSyncPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| JobError::InvalidPayload(e.to_string()))?;

        let monitor =
            match Monitor::find_by_id_and_tenant(&ctx.db, payload.monitor_id, payload.tenant_id)
                .await?
            {
                Some(monitor) => monitor,
                None => {
                    // Deleted between enqueue and claim.
                    info!(
                        monitor_id = %payload.monitor_id,
                        "Monitor no longer exists, skipping sync"
                    );
                    return Ok(());
                }
            };

        if monitor.paused {
            info!(monitor_id = %monitor.id, "Monitor is paused, skipping sync");
            return Ok(());
        }

        let network = Network::find_by_id(&ctx.db, monitor.network_id)
            .await?
            .ok_or_else(|| JobError::Failed("monitor references a missing network".to_string()))?;

        if !network.active {
            // Worth retrying: an operator reactivating the network lets a
            // queued sync complete.
            return Err(JobError::Failed(format!(
                "network '{}' is inactive",
                network.slug
            )));
        }

        // Drop cached copies so readers pick up the row as it is now.
        if let Some(cache) = &ctx.cache {
            if let Err(e) = cache.invalidate_monitor(monitor.tenant_id, monitor.id).await {
                warn!(
                    error = %e,
                    monitor_id = %monitor.id,
                    "Cache invalidation failed during sync"
                );
            }
        }

        info!(
            monitor_id = %monitor.id,
            tenant_id = %monitor.tenant_id,
            network = %network.slug,
            addresses = monitor.addresses.len(),
            requested_by = ?payload.requested_by,
            "Monitor sync completed"
        );

        Ok(())
    }
}
