//! Comment sweep background job.
//!
//! Periodically runs the comment engine over uploaded videos.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, JobError, JobSchedule, ShutdownBehavior},
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

pub struct CommentSweepJob {
    interval: Duration,
}

impl CommentSweepJob {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl BackgroundJob for CommentSweepJob {
    fn id(&self) -> &'static str {
        "comment_sweep"
    }

    fn name(&self) -> &'static str {
        "Comment Sweep"
    }

    fn description(&self) -> &'static str {
        "Reply to new viewer comments and record their sentiment"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Interval(self.interval)
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        // Missed comments are picked up by the next sweep.
        ShutdownBehavior::Cancellable
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let summary = ctx
            .comment_engine
            .run(ctx.max_replies, &ctx.cancellation_token)
            .await
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;

        info!(
            examined = summary.examined,
            replies = summary.replies_posted,
            skipped = summary.skipped,
            errors = summary.errors,
            "Comment sweep done"
        );

        Ok(())
    }
}
