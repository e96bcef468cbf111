//! Activity log cleanup background job.
//!
//! This job periodically deletes old activity log entries based on
//! the configured retention period.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, JobError, JobSchedule, ShutdownBehavior},
};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::info;

pub struct ActivityLogCleanupJob;

#[async_trait]
impl BackgroundJob for ActivityLogCleanupJob {
    fn id(&self) -> &'static str {
        "activity_log_cleanup"
    }

    fn name(&self) -> &'static str {
        "Activity Log Cleanup"
    }

    fn description(&self) -> &'static str {
        "Delete old activity log entries based on retention policy"
    }

    fn schedule(&self) -> JobSchedule {
        // Run every 24 hours (no startup run needed)
        JobSchedule::Interval(Duration::from_secs(24 * 60 * 60))
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        // This job can be cancelled - cleanup can happen next run
        ShutdownBehavior::Cancellable
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let cutoff = (Utc::now() - chrono::Duration::days(ctx.activity_retention_days)).to_rfc3339();

        info!(
            "Cleaning up activity log entries older than {} days (cutoff: {})",
            ctx.activity_retention_days, cutoff
        );

        let deleted = ctx
            .store
            .prune_activity_log(&cutoff)
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;

        if deleted > 0 {
            info!("Deleted {} old activity log entries", deleted);
        } else {
            info!("No activity log entries to clean up");
        }

        Ok(())
    }
}
