use super::context::JobContext;
use super::handle::{JobRunInfo, SchedulerCommand, SchedulerHandle, SharedJobState};
use super::job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior};
use crate::server::metrics;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Manages background job scheduling and execution.
pub struct JobScheduler {
    /// Shared state accessible by SchedulerHandle
    shared_state: Arc<RwLock<SharedJobState>>,

    /// Currently running jobs with their task handles (not shared, managed by scheduler loop)
    running_handles: HashMap<String, JoinHandle<()>>,

    /// Cancellation tokens for each running job.
    job_cancel_tokens: HashMap<String, CancellationToken>,

    /// Receiver for commands from SchedulerHandle
    command_receiver: mpsc::Receiver<SchedulerCommand>,

    /// Token to signal scheduler shutdown.
    shutdown_token: CancellationToken,

    /// Shared context provided to jobs during execution.
    job_context: JobContext,
}

impl JobScheduler {
    pub fn new(
        command_receiver: mpsc::Receiver<SchedulerCommand>,
        shutdown_token: CancellationToken,
        job_context: JobContext,
        shared_state: Arc<RwLock<SharedJobState>>,
    ) -> Self {
        Self {
            shared_state,
            running_handles: HashMap::new(),
            job_cancel_tokens: HashMap::new(),
            command_receiver,
            shutdown_token,
            job_context,
        }
    }

    /// Register a job with the scheduler.
    pub async fn register_job(&mut self, job: Arc<dyn BackgroundJob>) {
        let job_id = job.id().to_string();
        info!("Registering job: {} - {}", job_id, job.description());
        let mut state = self.shared_state.write().await;
        state.jobs.insert(job_id, job);
    }

    /// Get the number of registered jobs.
    pub async fn job_count(&self) -> usize {
        self.shared_state.read().await.jobs.len()
    }

    /// Main scheduler loop.
    pub async fn run(&mut self) {
        let job_count = self.job_count().await;
        info!("Starting job scheduler with {} registered jobs", job_count);

        self.trigger_jobs_for_hook(HookEvent::OnStartup).await;

        loop {
            // Clean up completed job handles
            self.cleanup_completed_jobs().await;

            let sleep_duration = self.time_until_next_scheduled_job().await;
            debug!(
                "Scheduler sleeping for {:?} until next scheduled job",
                sleep_duration
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_due_jobs().await;
                }
                Some(cmd) = self.command_receiver.recv() => {
                    self.handle_command(cmd).await;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Job scheduler stopped");
    }

    async fn handle_command(&mut self, cmd: SchedulerCommand) {
        match cmd {
            SchedulerCommand::TriggerJob { job_id, response } => {
                let result = self.trigger_job(&job_id).await;
                let _ = response.send(result);
            }
        }
    }

    /// Manually trigger a job by ID.
    async fn trigger_job(&mut self, job_id: &str) -> Result<(), JobError> {
        let state = self.shared_state.read().await;
        if !state.jobs.contains_key(job_id) {
            return Err(JobError::NotFound);
        }

        if state.running_jobs.contains(job_id) {
            return Err(JobError::AlreadyRunning);
        }
        drop(state);

        self.spawn_job(job_id, "manual").await;
        Ok(())
    }

    /// Calculate time until the next scheduled job should run.
    async fn time_until_next_scheduled_job(&self) -> Duration {
        let mut min_duration = Duration::from_secs(60); // Default check interval

        let state = self.shared_state.read().await;
        for (job_id, job) in &state.jobs {
            if state.running_jobs.contains(job_id) {
                continue; // Skip already running jobs
            }

            if let Some(next_run) = Self::next_run_time(&state, job_id, job.schedule()) {
                let now = Utc::now();
                if next_run > now {
                    let duration = (next_run - now).to_std().unwrap_or(Duration::from_secs(1));
                    if duration < min_duration {
                        min_duration = duration;
                    }
                } else {
                    // Job is due now
                    return Duration::from_secs(0);
                }
            }
        }

        min_duration
    }

    /// Next scheduled run for a job; hook-only jobs have none, interval
    /// jobs with no recorded next run are due immediately.
    fn next_run_time(
        state: &SharedJobState,
        job_id: &str,
        schedule: JobSchedule,
    ) -> Option<chrono::DateTime<Utc>> {
        match schedule {
            JobSchedule::Interval(_) => Some(
                state
                    .next_runs
                    .get(job_id)
                    .copied()
                    .unwrap_or_else(Utc::now),
            ),
            JobSchedule::Hook(_) => None,
            JobSchedule::Combined { interval, .. } => interval.map(|_| {
                state
                    .next_runs
                    .get(job_id)
                    .copied()
                    .unwrap_or_else(Utc::now)
            }),
        }
    }

    /// Run all jobs that are due for scheduled execution.
    async fn run_due_jobs(&mut self) {
        let now = Utc::now();
        let mut jobs_to_run = Vec::new();

        {
            let state = self.shared_state.read().await;
            for (job_id, job) in &state.jobs {
                if state.running_jobs.contains(job_id) {
                    continue;
                }

                if let Some(next_run) = Self::next_run_time(&state, job_id, job.schedule()) {
                    if next_run <= now {
                        jobs_to_run.push(job_id.clone());
                    }
                }
            }
        }

        for job_id in jobs_to_run {
            self.spawn_job(&job_id, "schedule").await;
        }
    }

    /// Trigger all jobs that listen for a specific hook event.
    async fn trigger_jobs_for_hook(&mut self, event: HookEvent) {
        let mut jobs_to_trigger = Vec::new();

        {
            let state = self.shared_state.read().await;
            for (job_id, job) in &state.jobs {
                if state.running_jobs.contains(job_id) {
                    debug!("Skipping hook trigger for already running job: {}", job_id);
                    continue;
                }

                let should_trigger = match job.schedule() {
                    JobSchedule::Hook(hook_event) => hook_event == event,
                    JobSchedule::Combined { ref hooks, .. } => hooks.contains(&event),
                    _ => false,
                };

                if should_trigger {
                    jobs_to_trigger.push(job_id.clone());
                }
            }
        }

        for job_id in jobs_to_trigger {
            let trigger = format!("hook:{}", event);
            self.spawn_job(&job_id, &trigger).await;
        }
    }

    /// Spawn a job execution task.
    async fn spawn_job(&mut self, job_id: &str, triggered_by: &str) {
        let job = {
            let state = self.shared_state.read().await;
            match state.jobs.get(job_id) {
                Some(job) => Arc::clone(job),
                None => {
                    error!("Attempted to spawn unknown job: {}", job_id);
                    return;
                }
            }
        };

        info!("Starting job: {} (triggered_by: {})", job_id, triggered_by);

        let interval = match job.schedule() {
            JobSchedule::Interval(int) => Some(int),
            JobSchedule::Combined { interval, .. } => interval,
            _ => None,
        };

        // Mark running and push next_run out by one interval so the loop
        // does not re-trigger the job before it completes.
        {
            let mut state = self.shared_state.write().await;
            state.running_jobs.insert(job_id.to_string());
            state.last_runs.insert(
                job_id.to_string(),
                JobRunInfo {
                    started_at: Utc::now().to_rfc3339(),
                    finished_at: None,
                    status: "running".to_string(),
                    error_message: None,
                    triggered_by: triggered_by.to_string(),
                },
            );
            if let Some(interval) = interval {
                let next_run =
                    Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default();
                state.next_runs.insert(job_id.to_string(), next_run);
            }
        }

        metrics::set_job_running(job_id, true);

        // Create cancellation token for this job
        let cancel_token = self.job_context.cancellation_token.child_token();
        self.job_cancel_tokens
            .insert(job_id.to_string(), cancel_token.clone());

        let ctx = JobContext {
            cancellation_token: cancel_token,
            ..self.job_context.clone()
        };

        let job_id_owned = job_id.to_string();
        let shared_state = Arc::clone(&self.shared_state);

        let handle = tokio::spawn(async move {
            let start_time = Instant::now();
            let result = job.execute(&ctx).await;
            let elapsed = start_time.elapsed();

            let (status, error_msg) = match result {
                Ok(()) => {
                    info!(
                        "Job {} completed successfully in {:?}",
                        job_id_owned, elapsed
                    );
                    ("completed", None)
                }
                Err(JobError::Cancelled) => {
                    info!("Job {} was cancelled after {:?}", job_id_owned, elapsed);
                    ("cancelled", Some("Cancelled".to_string()))
                }
                Err(e) => {
                    error!("Job {} failed after {:?}: {}", job_id_owned, elapsed, e);
                    ("failed", Some(e.to_string()))
                }
            };

            metrics::record_job_execution(&job_id_owned, status, elapsed);
            metrics::set_job_running(&job_id_owned, false);

            let mut state = shared_state.write().await;
            state.running_jobs.remove(&job_id_owned);
            if let Some(run) = state.last_runs.get_mut(&job_id_owned) {
                run.finished_at = Some(Utc::now().to_rfc3339());
                run.status = status.to_string();
                run.error_message = error_msg;
            }
            if let Some(interval) = interval {
                let next_run =
                    Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default();
                state.next_runs.insert(job_id_owned, next_run);
            }
        });

        self.running_handles.insert(job_id.to_string(), handle);
    }

    /// Clean up handles for completed jobs.
    async fn cleanup_completed_jobs(&mut self) {
        let mut completed = Vec::new();

        for (job_id, handle) in &self.running_handles {
            if handle.is_finished() {
                completed.push(job_id.clone());
            }
        }

        for job_id in completed {
            if let Some(handle) = self.running_handles.remove(&job_id) {
                let _ = handle.await;
            }
            self.job_cancel_tokens.remove(&job_id);
        }
    }

    /// Gracefully shut down the scheduler.
    async fn shutdown(&mut self) {
        info!("Shutting down scheduler...");

        // Cancel cancellable jobs
        {
            let state = self.shared_state.read().await;
            for job_id in &state.running_jobs {
                if let Some(job) = state.jobs.get(job_id) {
                    if job.shutdown_behavior() == ShutdownBehavior::Cancellable {
                        if let Some(token) = self.job_cancel_tokens.get(job_id) {
                            debug!("Cancelling job: {}", job_id);
                            token.cancel();
                        }
                    }
                }
            }
        }

        // Wait for all jobs to complete
        let mut wait_jobs = Vec::new();
        for (job_id, handle) in self.running_handles.drain() {
            let behavior = {
                let state = self.shared_state.read().await;
                state
                    .jobs
                    .get(&job_id)
                    .map(|j| j.shutdown_behavior())
                    .unwrap_or(ShutdownBehavior::Cancellable)
            };
            wait_jobs.push((job_id, handle, behavior));
        }

        for (job_id, handle, behavior) in wait_jobs {
            if behavior == ShutdownBehavior::WaitForCompletion {
                info!("Waiting for job {} to complete...", job_id);
            }
            let _ = tokio::time::timeout(Duration::from_secs(30), handle).await;
        }

        self.job_cancel_tokens.clear();
        info!("Scheduler shutdown complete");
    }
}

/// Create a scheduler and its handle.
pub fn create_scheduler(
    shutdown_token: CancellationToken,
    job_context: JobContext,
) -> (JobScheduler, SchedulerHandle) {
    let (command_tx, command_rx) = mpsc::channel(100);
    let shared_state = Arc::new(RwLock::new(SharedJobState::new()));

    let scheduler = JobScheduler::new(
        command_rx,
        shutdown_token,
        job_context,
        Arc::clone(&shared_state),
    );

    let handle = SchedulerHandle::new(command_tx, shared_state);

    (scheduler, handle)
}
