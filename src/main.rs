use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod background_jobs;
mod config;
mod enrichment;
mod server;
mod store;
mod workflows;
mod youtube;

use background_jobs::{
    create_scheduler,
    jobs::{ActivityLogCleanupJob, CommentSweepJob, UploadBatchJob},
    JobContext,
};
use config::{AppConfig, CliConfig, FileConfig};
use enrichment::{ContentGenerator, OpenAiGenerator};
use server::{run_server, ServerState};
use store::{SongStore, SqliteSongStore};
use tokio_util::sync::CancellationToken;
use workflows::{CommentEngine, CommentSettings, UploadEngine, UploadSettings};
use youtube::{VideoPlatform, YouTubeClient, YouTubeClientConfig};

#[derive(Parser, Debug)]
#[clap(name = "songflow-server", about = "Music publishing automation daemon")]
struct CliArgs {
    /// Path to a TOML config file. Values there override CLI flags.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite database.
    #[clap(long)]
    pub db_dir: Option<PathBuf>,

    /// The port the admin server listens on.
    #[clap(short, long, default_value_t = 3002)]
    pub port: u16,

    /// YouTube Data API key.
    #[clap(long)]
    pub api_key: Option<String>,

    /// OAuth access token for YouTube writes.
    #[clap(long)]
    pub access_token: Option<String>,

    /// Our own channel id, used to recognize replies we already posted.
    #[clap(long)]
    pub channel_id: Option<String>,

    /// OpenAI API key for metadata and reply generation.
    #[clap(long)]
    pub openai_api_key: Option<String>,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the daemon: scheduler plus admin HTTP server (default).
    Run,
    /// Upload one batch of pending songs and exit.
    Upload {
        /// Most songs to take on; defaults to the configured upload_limit.
        #[clap(long)]
        limit: Option<usize>,
    },
    /// Sweep comments on uploaded videos once and exit.
    Comments {
        /// Reply budget; defaults to the configured max_replies.
        #[clap(long)]
        max_replies: Option<usize>,
    },
    /// Print song counts by status.
    Status,
}

struct Services {
    store: Arc<SqliteSongStore>,
    platform: Arc<dyn VideoPlatform>,
    upload_engine: Arc<UploadEngine>,
    comment_engine: Arc<CommentEngine>,
}

fn build_services(config: &AppConfig) -> Result<Services> {
    info!("Opening SQLite database at {:?}...", config.songs_db_path());
    let store = Arc::new(SqliteSongStore::new(config.songs_db_path())?);

    let platform: Arc<dyn VideoPlatform> = Arc::new(YouTubeClient::new(YouTubeClientConfig {
        api_key: config.youtube.api_key.clone(),
        token_source: config.youtube.token_source.clone(),
        channel_id: config.youtube.channel_id.clone(),
        daily_quota_units: config.youtube.daily_quota_units,
        request_timeout: config.youtube.request_timeout,
    }));

    let generator: Arc<dyn ContentGenerator> = Arc::new(OpenAiGenerator::new(
        config.openai.base_url.clone(),
        config.openai.model.clone(),
        config.openai.api_key.clone(),
        config.openai.request_timeout,
    ));

    let upload_engine = Arc::new(UploadEngine::new(
        store.clone() as Arc<dyn SongStore>,
        platform.clone(),
        generator.clone(),
        UploadSettings {
            auto_metadata: config.workflows.auto_metadata,
            retry_backoff: config.workflows.retry_backoff,
        },
    ));

    let comment_engine = Arc::new(CommentEngine::new(
        store.clone() as Arc<dyn SongStore>,
        platform.clone(),
        generator,
        CommentSettings {
            page_size: config.workflows.page_size,
            video_scan_limit: config.workflows.video_scan_limit,
            retry_backoff: config.workflows.retry_backoff,
        },
    ));

    Ok(Services {
        store,
        platform,
        upload_engine,
        comment_engine,
    })
}

async fn run_daemon(config: AppConfig, services: Services) -> Result<()> {
    info!("Initializing metrics...");
    server::metrics::init_metrics();

    let shutdown_token = CancellationToken::new();

    let job_context = JobContext::new(
        shutdown_token.child_token(),
        services.store.clone(),
        services.upload_engine,
        services.comment_engine,
        config.workflows.upload_limit,
        config.workflows.max_replies,
        config.workflows.activity_retention_days,
    );

    let (mut scheduler, handle) = create_scheduler(shutdown_token.clone(), job_context);
    scheduler
        .register_job(Arc::new(UploadBatchJob::new(
            config.workflows.upload_interval,
        )))
        .await;
    scheduler
        .register_job(Arc::new(CommentSweepJob::new(
            config.workflows.comment_interval,
        )))
        .await;
    scheduler.register_job(Arc::new(ActivityLogCleanupJob)).await;

    let scheduler_task = tokio::spawn(async move { scheduler.run().await });

    let ctrl_c_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            ctrl_c_token.cancel();
        }
    });

    let state = ServerState {
        start_time: Instant::now(),
        hash: env!("GIT_HASH").to_string(),
        store: services.store,
        platform: services.platform,
        scheduler: handle,
    };

    run_server(state, config.port, shutdown_token.clone()).await?;

    shutdown_token.cancel();
    scheduler_task
        .await
        .context("Scheduler task panicked during shutdown")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .ok();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    let cli_config = CliConfig {
        db_dir: cli_args.db_dir.clone(),
        port: cli_args.port,
        api_key: cli_args.api_key.clone(),
        access_token: cli_args.access_token.clone(),
        channel_id: cli_args.channel_id.clone(),
        openai_api_key: cli_args.openai_api_key.clone(),
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let services = build_services(&config)?;

    match cli_args.command.unwrap_or(Command::Run) {
        Command::Run => run_daemon(config, services).await,
        Command::Upload { limit } => {
            let limit = limit.unwrap_or(config.workflows.upload_limit);
            let summary = services
                .upload_engine
                .run(limit, &CancellationToken::new())
                .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if summary.quota_aborted {
                std::process::exit(2);
            }
            Ok(())
        }
        Command::Comments { max_replies } => {
            let max_replies = max_replies.unwrap_or(config.workflows.max_replies);
            let summary = services
                .comment_engine
                .run(max_replies, &CancellationToken::new())
                .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Status => {
            let counts = services.store.count_songs_by_status()?;
            for (status, count) in counts {
                println!("{}: {}", status.as_str(), count);
            }
            Ok(())
        }
    }
}
