//! End-to-end tests for the admin HTTP surface
//!
//! Covers status, job listing, workflow triggers, and metrics exposure.

mod common;

use common::TestServer;
use reqwest::StatusCode;
use songflow_server::store::{SongStatus, SongStore};
use std::time::Duration;

async fn get(server: &TestServer, path: &str) -> reqwest::Response {
    reqwest::get(format!("{}{}", server.base_url, path))
        .await
        .expect("Request failed")
}

async fn post(server: &TestServer, path: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}{}", server.base_url, path))
        .send()
        .await
        .expect("Request failed")
}

#[tokio::test]
async fn test_home_reports_uptime_and_hash() {
    let server = TestServer::spawn().await;

    let response = get(&server, "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["hash"], "test");
    assert!(body["uptime"].as_str().unwrap().contains("d "));
}

#[tokio::test]
async fn test_status_reports_song_counts_and_quota() {
    let server = TestServer::spawn().await;
    server
        .harness
        .add_pending_song("Queued", Some("http://assets/a.mp3"));

    let response = get(&server, "/status").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["songs"]["pending"].as_u64().unwrap(), 1);
    assert_eq!(body["quota"]["daily_limit"].as_u64().unwrap(), 10_000);
}

#[tokio::test]
async fn test_jobs_listing_contains_registered_jobs() {
    let server = TestServer::spawn().await;

    let response = get(&server, "/jobs").await;
    assert_eq!(response.status(), StatusCode::OK);

    let jobs: serde_json::Value = response.json().await.unwrap();
    let ids: Vec<&str> = jobs
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"upload_batch"));
    assert!(ids.contains(&"comment_sweep"));
    assert!(ids.contains(&"activity_log_cleanup"));
}

#[tokio::test]
async fn test_get_unknown_job_returns_404() {
    let server = TestServer::spawn().await;

    let response = get(&server, "/jobs/nonexistent").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trigger_unknown_job_returns_404() {
    let server = TestServer::spawn().await;

    let response = post(&server, "/jobs/nonexistent/trigger").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trigger_upload_workflow_uploads_pending_song() {
    let server = TestServer::spawn().await;
    let song = server
        .harness
        .add_pending_song("Triggered", Some("http://assets/a.mp3"));

    // The startup run may still be in flight; retry while the job is busy.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        let response = post(&server, "/workflows/upload").await;
        if response.status() == StatusCode::ACCEPTED {
            break;
        }
        assert_eq!(response.status(), StatusCode::CONFLICT);
        if std::time::Instant::now() > deadline {
            panic!("Upload job stayed busy");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // The job runs asynchronously; poll for the outcome.
    loop {
        let status = server.harness.store.get_song(&song.id).unwrap().status;
        if status == SongStatus::Uploaded {
            break;
        }
        if std::time::Instant::now() > deadline {
            panic!("Song was not uploaded after trigger, status: {}", status);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_trigger_comments_workflow_accepted() {
    let server = TestServer::spawn().await;

    let response = post(&server, "/workflows/comments").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_prometheus_text() {
    let server = TestServer::spawn().await;
    songflow_server::server::metrics::init_metrics();
    songflow_server::server::metrics::record_workflow_run("upload", "completed", 0.1);

    let response = get(&server, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.text().await.unwrap();
    assert!(body.contains("songflow_workflow_runs_total"));
}
