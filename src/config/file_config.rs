use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,

    // Feature configs
    pub youtube: Option<YouTubeConfig>,
    pub openai: Option<OpenAiConfig>,
    pub workflows: Option<WorkflowsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct YouTubeConfig {
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    /// Shell command printing a fresh access token to stdout.
    pub access_token_command: Option<String>,
    pub channel_id: Option<String>,
    pub daily_quota_units: Option<u64>,
    pub request_timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct WorkflowsConfig {
    pub upload_limit: Option<usize>,
    pub max_replies: Option<usize>,
    pub page_size: Option<usize>,
    pub video_scan_limit: Option<usize>,
    pub auto_metadata: Option<bool>,
    pub upload_interval_minutes: Option<u64>,
    pub comment_interval_minutes: Option<u64>,
    pub activity_retention_days: Option<i64>,
    pub retry_backoff_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
