use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Encoder, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all songflow metrics
const PREFIX: &str = "songflow";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Workflow metrics
    pub static ref SONGS_UPLOADED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_songs_uploaded_total"), "Song upload outcomes"),
        &["outcome"]
    ).expect("Failed to create songs_uploaded_total metric");

    pub static ref REPLIES_POSTED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_replies_posted_total"),
        "Comment replies posted"
    ).expect("Failed to create replies_posted_total metric");

    pub static ref COMMENTS_EXAMINED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_comments_examined_total"),
        "Viewer comments examined"
    ).expect("Failed to create comments_examined_total metric");

    pub static ref WORKFLOW_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_workflow_runs_total"), "Workflow runs by outcome"),
        &["workflow", "status"]
    ).expect("Failed to create workflow_runs_total metric");

    pub static ref WORKFLOW_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_workflow_duration_seconds"),
            "Workflow run duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
        &["workflow"]
    ).expect("Failed to create workflow_duration_seconds metric");

    pub static ref SONGS_PENDING: Gauge = Gauge::new(
        format!("{PREFIX}_songs_pending"),
        "Songs currently waiting for upload"
    ).expect("Failed to create songs_pending metric");

    // Background job metrics
    pub static ref JOB_RUNNING: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_job_running"), "Whether a background job is running"),
        &["job_id"]
    ).expect("Failed to create job_running metric");

    pub static ref JOB_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_job_executions_total"), "Background job executions"),
        &["job_id", "status"]
    ).expect("Failed to create job_executions_total metric");

    pub static ref JOB_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_job_duration_seconds"),
            "Background job duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
        &["job_id"]
    ).expect("Failed to create job_duration_seconds metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(SONGS_UPLOADED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REPLIES_POSTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(COMMENTS_EXAMINED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(WORKFLOW_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(WORKFLOW_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(SONGS_PENDING.clone()));
    let _ = REGISTRY.register(Box::new(JOB_RUNNING.clone()));
    let _ = REGISTRY.register(Box::new(JOB_EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(JOB_DURATION_SECONDS.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record one song's upload outcome (uploaded, failed, url_expired, ...).
pub fn record_song_upload(outcome: &str) {
    SONGS_UPLOADED_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_reply_posted() {
    REPLIES_POSTED_TOTAL.inc();
}

pub fn record_comment_examined() {
    COMMENTS_EXAMINED_TOTAL.inc();
}

/// Record a completed workflow run.
pub fn record_workflow_run(workflow: &str, status: &str, duration_secs: f64) {
    WORKFLOW_RUNS_TOTAL
        .with_label_values(&[workflow, status])
        .inc();
    WORKFLOW_DURATION_SECONDS
        .with_label_values(&[workflow])
        .observe(duration_secs);
}

pub fn set_songs_pending(count: u64) {
    SONGS_PENDING.set(count as f64);
}

/// Mark a background job as running or idle.
pub fn set_job_running(job_id: &str, running: bool) {
    JOB_RUNNING
        .with_label_values(&[job_id])
        .set(if running { 1.0 } else { 0.0 });
}

/// Record a background job execution
pub fn record_job_execution(job_id: &str, status: &str, duration: Duration) {
    JOB_EXECUTIONS_TOTAL
        .with_label_values(&[job_id, status])
        .inc();
    JOB_DURATION_SECONDS
        .with_label_values(&[job_id])
        .observe(duration.as_secs_f64());
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
