use super::job::{BackgroundJob, JobError, JobSchedule};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};

/// Information about a registered job for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub schedule: JobScheduleInfo,
    pub is_running: bool,
    pub last_run: Option<JobRunInfo>,
    pub next_run_at: Option<String>,
}

/// Serializable schedule information.
#[derive(Debug, Clone, Serialize)]
pub struct JobScheduleInfo {
    #[serde(rename = "type")]
    pub schedule_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hooks: Option<Vec<String>>,
}

impl From<JobSchedule> for JobScheduleInfo {
    fn from(schedule: JobSchedule) -> Self {
        match schedule {
            JobSchedule::Interval(duration) => JobScheduleInfo {
                schedule_type: "interval".to_string(),
                value_secs: Some(duration.as_secs()),
                hooks: None,
            },
            JobSchedule::Hook(event) => JobScheduleInfo {
                schedule_type: "hook".to_string(),
                hooks: Some(vec![event.to_string()]),
                value_secs: None,
            },
            JobSchedule::Combined { interval, hooks } => JobScheduleInfo {
                schedule_type: "combined".to_string(),
                value_secs: interval.map(|d| d.as_secs()),
                hooks: Some(hooks.iter().map(|h| h.to_string()).collect()),
            },
        }
    }
}

/// The most recent run of a job. Kept in memory; the durable trace of
/// what the jobs actually did lives in the activity log.
#[derive(Debug, Clone, Serialize)]
pub struct JobRunInfo {
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub triggered_by: String,
}

/// Command sent to the scheduler.
pub enum SchedulerCommand {
    TriggerJob {
        job_id: String,
        response: oneshot::Sender<Result<(), JobError>>,
    },
}

/// Shared state between scheduler and handle.
pub struct SharedJobState {
    /// Static job info (set at registration, never changes)
    pub jobs: HashMap<String, Arc<dyn BackgroundJob>>,
    /// Currently running job IDs
    pub running_jobs: HashSet<String>,
    /// Most recent run per job
    pub last_runs: HashMap<String, JobRunInfo>,
    /// Next scheduled run per interval job
    pub next_runs: HashMap<String, DateTime<Utc>>,
}

impl SharedJobState {
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
            running_jobs: HashSet::new(),
            last_runs: HashMap::new(),
            next_runs: HashMap::new(),
        }
    }
}

impl Default for SharedJobState {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to interact with the job scheduler from HTTP handlers.
#[derive(Clone)]
pub struct SchedulerHandle {
    /// Channel to send commands to the scheduler
    command_tx: mpsc::Sender<SchedulerCommand>,
    /// Shared state for reading job info
    shared_state: Arc<RwLock<SharedJobState>>,
}

impl SchedulerHandle {
    pub fn new(
        command_tx: mpsc::Sender<SchedulerCommand>,
        shared_state: Arc<RwLock<SharedJobState>>,
    ) -> Self {
        Self {
            command_tx,
            shared_state,
        }
    }

    /// Get information about all registered jobs.
    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        let state = self.shared_state.read().await;
        let mut jobs: Vec<JobInfo> = state
            .jobs
            .iter()
            .map(|(job_id, job)| Self::job_info(&state, job_id, job.as_ref()))
            .collect();

        // Sort by job ID for consistent ordering
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    /// Get information about a specific job.
    pub async fn get_job(&self, job_id: &str) -> Option<JobInfo> {
        let state = self.shared_state.read().await;
        state
            .jobs
            .get(job_id)
            .map(|job| Self::job_info(&state, job_id, job.as_ref()))
    }

    fn job_info(state: &SharedJobState, job_id: &str, job: &dyn BackgroundJob) -> JobInfo {
        JobInfo {
            id: job_id.to_string(),
            name: job.name().to_string(),
            description: job.description().to_string(),
            schedule: job.schedule().into(),
            is_running: state.running_jobs.contains(job_id),
            last_run: state.last_runs.get(job_id).cloned(),
            next_run_at: state.next_runs.get(job_id).map(|dt| dt.to_rfc3339()),
        }
    }

    /// Trigger a job manually.
    pub async fn trigger_job(&self, job_id: &str) -> Result<(), JobError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(SchedulerCommand::TriggerJob {
                job_id: job_id.to_string(),
                response: response_tx,
            })
            .await
            .map_err(|_| JobError::ExecutionFailed("Scheduler not available".to_string()))?;

        response_rx
            .await
            .map_err(|_| JobError::ExecutionFailed("Scheduler did not respond".to_string()))?
    }

    /// Check if a job is currently running.
    pub async fn is_job_running(&self, job_id: &str) -> bool {
        let state = self.shared_state.read().await;
        state.running_jobs.contains(job_id)
    }

    /// Check if a job with the given ID exists.
    pub async fn job_exists(&self, job_id: &str) -> bool {
        let state = self.shared_state.read().await;
        state.jobs.contains_key(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background_jobs::job::HookEvent;
    use std::time::Duration;

    #[test]
    fn test_job_schedule_info_from_interval() {
        let schedule = JobSchedule::Interval(Duration::from_secs(3600));
        let info: JobScheduleInfo = schedule.into();

        assert_eq!(info.schedule_type, "interval");
        assert_eq!(info.value_secs, Some(3600));
        assert!(info.hooks.is_none());
    }

    #[test]
    fn test_job_schedule_info_from_hook() {
        let schedule = JobSchedule::Hook(HookEvent::OnStartup);
        let info: JobScheduleInfo = schedule.into();

        assert_eq!(info.schedule_type, "hook");
        assert_eq!(info.hooks, Some(vec!["OnStartup".to_string()]));
        assert!(info.value_secs.is_none());
    }

    #[test]
    fn test_job_schedule_info_from_combined() {
        let schedule = JobSchedule::Combined {
            interval: Some(Duration::from_secs(1800)),
            hooks: vec![HookEvent::OnStartup],
        };
        let info: JobScheduleInfo = schedule.into();

        assert_eq!(info.schedule_type, "combined");
        assert_eq!(info.value_secs, Some(1800));
        assert_eq!(info.hooks, Some(vec!["OnStartup".to_string()]));
    }

    #[test]
    fn test_job_schedule_info_combined_without_interval() {
        let schedule = JobSchedule::Combined {
            interval: None,
            hooks: vec![HookEvent::OnStartup],
        };
        let info: JobScheduleInfo = schedule.into();

        assert_eq!(info.schedule_type, "combined");
        assert!(info.value_secs.is_none());
    }
}
