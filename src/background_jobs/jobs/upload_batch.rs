//! Upload batch background job.
//!
//! Periodically drains the pending-song queue through the upload engine.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

pub struct UploadBatchJob {
    interval: Duration,
}

impl UploadBatchJob {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl BackgroundJob for UploadBatchJob {
    fn id(&self) -> &'static str {
        "upload_batch"
    }

    fn name(&self) -> &'static str {
        "Upload Batch"
    }

    fn description(&self) -> &'static str {
        "Upload pending songs to the video platform"
    }

    fn schedule(&self) -> JobSchedule {
        // Also runs once at startup so a restart never strands songs
        // until the first interval elapses.
        JobSchedule::Combined {
            interval: Some(self.interval),
            hooks: vec![HookEvent::OnStartup],
        }
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        // The engine checks the token between songs; an upload in flight
        // finishes its commit before the job returns.
        ShutdownBehavior::WaitForCompletion
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let summary = ctx
            .upload_engine
            .run(ctx.upload_limit, &ctx.cancellation_token)
            .await
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;

        if summary.quota_aborted {
            warn!(
                uploaded = summary.uploaded,
                skipped = summary.skipped,
                "Upload batch aborted on quota"
            );
        } else {
            info!(
                attempted = summary.attempted,
                uploaded = summary.uploaded,
                failed = summary.failed,
                url_expired = summary.url_expired,
                "Upload batch done"
            );
        }

        Ok(())
    }
}
