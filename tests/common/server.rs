//! Admin test server lifecycle management
//!
//! Each test gets an isolated admin server on a random port, backed by
//! a fresh harness and a real job scheduler.

use super::harness::TestHarness;
use songflow_server::background_jobs::{
    create_scheduler,
    jobs::{ActivityLogCleanupJob, CommentSweepJob, UploadBatchJob},
    JobContext,
};
use songflow_server::server::{make_router, ServerState};
use songflow_server::store::SongStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const SERVER_READY_TIMEOUT_MS: u64 = 5_000;
const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Long enough that interval ticks never fire during a test; jobs run
/// only via the startup hook or explicit triggers.
const TEST_JOB_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub struct TestServer {
    pub base_url: String,
    pub harness: TestHarness,
    shutdown_token: CancellationToken,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let harness = TestHarness::new();
        let shutdown_token = CancellationToken::new();

        let job_context = JobContext::new(
            shutdown_token.child_token(),
            harness.store.clone() as Arc<dyn SongStore>,
            harness.upload_engine.clone(),
            harness.comment_engine.clone(),
            10,
            10,
            90,
        );

        let (mut scheduler, handle) = create_scheduler(shutdown_token.clone(), job_context);
        scheduler
            .register_job(Arc::new(UploadBatchJob::new(TEST_JOB_INTERVAL)))
            .await;
        scheduler
            .register_job(Arc::new(CommentSweepJob::new(TEST_JOB_INTERVAL)))
            .await;
        scheduler.register_job(Arc::new(ActivityLogCleanupJob)).await;

        tokio::spawn(async move { scheduler.run().await });

        let state = ServerState {
            start_time: Instant::now(),
            hash: "test".to_string(),
            store: harness.store.clone() as Arc<dyn SongStore>,
            platform: harness.platform.clone(),
            scheduler: handle,
        };

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let router = make_router(state);
        let server_token = shutdown_token.clone();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(server_token.cancelled_owned())
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            harness,
            shutdown_token,
        };
        server.wait_for_ready().await;
        server
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
