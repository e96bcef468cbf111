//! Admin HTTP surface: daemon status, job control, workflow triggers,
//! Prometheus metrics.

pub mod metrics;

use crate::background_jobs::{JobError, SchedulerHandle};
use crate::store::{SongStatus, SongStore};
use crate::youtube::{QuotaStatus, VideoPlatform};
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ServerState {
    pub start_time: Instant,
    pub hash: String,
    pub store: Arc<dyn SongStore>,
    pub platform: Arc<dyn VideoPlatform>,
    pub scheduler: SchedulerHandle,
}

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

#[derive(Serialize)]
struct StatusResponse {
    songs: BTreeMap<String, u64>,
    quota: Option<QuotaStatus>,
}

async fn status(State(state): State<ServerState>) -> Response {
    let counts = match state.store.count_songs_by_status() {
        Ok(counts) => counts,
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", e)).into_response();
        }
    };

    let pending = counts
        .iter()
        .find(|(status, _)| *status == SongStatus::Pending)
        .map(|(_, count)| *count)
        .unwrap_or(0);
    metrics::set_songs_pending(pending);

    let quota = match state.platform.check_quota().await {
        Ok(quota) => Some(quota),
        Err(e) => {
            warn!(error = %e, "Quota check failed");
            None
        }
    };

    let songs = counts
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), count))
        .collect();

    Json(StatusResponse { songs, quota }).into_response()
}

async fn list_jobs(State(state): State<ServerState>) -> Response {
    Json(state.scheduler.list_jobs().await).into_response()
}

async fn get_job(State(state): State<ServerState>, Path(id): Path<String>) -> Response {
    match state.scheduler.get_job(&id).await {
        Some(job) => Json(job).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn trigger_response(result: std::result::Result<(), JobError>) -> Response {
    match result {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(JobError::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(JobError::AlreadyRunning) => {
            (StatusCode::CONFLICT, "job is already running").into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", e)).into_response(),
    }
}

async fn trigger_job(State(state): State<ServerState>, Path(id): Path<String>) -> Response {
    trigger_response(state.scheduler.trigger_job(&id).await)
}

async fn trigger_upload_workflow(State(state): State<ServerState>) -> Response {
    trigger_response(state.scheduler.trigger_job("upload_batch").await)
}

async fn trigger_comments_workflow(State(state): State<ServerState>) -> Response {
    trigger_response(state.scheduler.trigger_job("comment_sweep").await)
}

pub fn make_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/status", get(status))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/trigger", post(trigger_job))
        .route("/workflows/upload", post(trigger_upload_workflow))
        .route("/workflows/comments", post(trigger_comments_workflow))
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(state)
}

pub async fn run_server(state: ServerState, port: u16, shutdown: CancellationToken) -> Result<()> {
    let router = make_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Admin server listening on port {}", port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Admin server stopped");
    Ok(())
}
