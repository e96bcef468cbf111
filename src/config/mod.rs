mod file_config;

pub use file_config::{FileConfig, OpenAiConfig, WorkflowsConfig, YouTubeConfig};

use crate::youtube::TokenSource;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub channel_id: Option<String>,
    pub openai_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,

    // Feature configs (with defaults)
    pub youtube: YouTubeSettings,
    pub openai: OpenAiSettings,
    pub workflows: WorkflowsSettings,
}

#[derive(Debug, Clone)]
pub struct YouTubeSettings {
    pub api_key: String,
    pub token_source: TokenSource,
    pub channel_id: Option<String>,
    pub daily_quota_units: u64,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkflowsSettings {
    pub upload_limit: usize,
    pub max_replies: usize,
    pub page_size: usize,
    pub video_scan_limit: usize,
    pub auto_metadata: bool,
    pub upload_interval: Duration,
    pub comment_interval: Duration,
    pub activity_retention_days: i64,
    pub retry_backoff: Duration,
}

impl Default for WorkflowsSettings {
    fn default() -> Self {
        Self {
            upload_limit: 10,
            max_replies: 10,
            page_size: 100,
            video_scan_limit: 50,
            auto_metadata: true,
            upload_interval: Duration::from_secs(60 * 60),
            comment_interval: Duration::from_secs(30 * 60),
            activity_retention_days: 90,
            retry_backoff: Duration::from_millis(2000),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        // Validate db_dir exists
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let yt_file = file.youtube.unwrap_or_default();
        let api_key = yt_file
            .api_key
            .or_else(|| cli.api_key.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("YouTube api_key must be specified via --api-key or in config file")
            })?;

        let access_token = yt_file.access_token.or_else(|| cli.access_token.clone());
        let token_source = match (access_token, yt_file.access_token_command) {
            (Some(_), Some(_)) => {
                bail!("access_token and access_token_command are mutually exclusive")
            }
            (Some(token), None) => TokenSource::Static(token),
            (None, Some(cmd)) => TokenSource::Command(cmd),
            (None, None) => TokenSource::None,
        };

        let youtube = YouTubeSettings {
            api_key,
            token_source,
            channel_id: yt_file.channel_id.or_else(|| cli.channel_id.clone()),
            daily_quota_units: yt_file.daily_quota_units.unwrap_or(10_000),
            request_timeout: Duration::from_secs(yt_file.request_timeout_sec.unwrap_or(30)),
        };

        let oa_file = file.openai.unwrap_or_default();
        let openai = OpenAiSettings {
            base_url: oa_file
                .base_url
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: oa_file.model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            api_key: oa_file.api_key.or_else(|| cli.openai_api_key.clone()),
            request_timeout: Duration::from_secs(oa_file.request_timeout_sec.unwrap_or(30)),
        };

        let wf_file = file.workflows.unwrap_or_default();
        let defaults = WorkflowsSettings::default();
        let workflows = WorkflowsSettings {
            upload_limit: wf_file.upload_limit.unwrap_or(defaults.upload_limit),
            max_replies: wf_file.max_replies.unwrap_or(defaults.max_replies),
            page_size: wf_file.page_size.unwrap_or(defaults.page_size),
            video_scan_limit: wf_file
                .video_scan_limit
                .unwrap_or(defaults.video_scan_limit),
            auto_metadata: wf_file.auto_metadata.unwrap_or(defaults.auto_metadata),
            upload_interval: wf_file
                .upload_interval_minutes
                .map(|m| Duration::from_secs(m * 60))
                .unwrap_or(defaults.upload_interval),
            comment_interval: wf_file
                .comment_interval_minutes
                .map(|m| Duration::from_secs(m * 60))
                .unwrap_or(defaults.comment_interval),
            activity_retention_days: wf_file
                .activity_retention_days
                .unwrap_or(defaults.activity_retention_days),
            retry_backoff: wf_file
                .retry_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
        };

        if workflows.page_size == 0 {
            bail!("workflows.page_size must be at least 1");
        }

        Ok(Self {
            db_dir,
            port,
            youtube,
            openai,
            workflows,
        })
    }

    pub fn songs_db_path(&self) -> PathBuf {
        self.db_dir.join("songs.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_db_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn cli_with_db(dir: &TempDir) -> CliConfig {
        CliConfig {
            db_dir: Some(dir.path().to_path_buf()),
            port: 3002,
            api_key: Some("cli-key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            port: 3002,
            api_key: Some("yt-key".to_string()),
            access_token: Some("yt-token".to_string()),
            channel_id: Some("UCme".to_string()),
            openai_api_key: Some("oa-key".to_string()),
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 3002);
        assert_eq!(config.youtube.api_key, "yt-key");
        assert!(matches!(
            config.youtube.token_source,
            TokenSource::Static(ref t) if t == "yt-token"
        ));
        assert_eq!(config.youtube.channel_id, Some("UCme".to_string()));
        assert_eq!(config.youtube.daily_quota_units, 10_000);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.api_key, Some("oa-key".to_string()));
        assert_eq!(config.workflows.upload_limit, 10);
        assert_eq!(config.workflows.page_size, 100);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            port: 3002,
            api_key: Some("cli-key".to_string()),
            ..Default::default()
        };

        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            port: Some(4000),
            youtube: Some(YouTubeConfig {
                api_key: Some("toml-key".to_string()),
                daily_quota_units: Some(5_000),
                ..Default::default()
            }),
            workflows: Some(WorkflowsConfig {
                upload_limit: Some(3),
                retry_backoff_ms: Some(500),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 4000);
        assert_eq!(config.youtube.api_key, "toml-key");
        assert_eq!(config.youtube.daily_quota_units, 5_000);
        assert_eq!(config.workflows.upload_limit, 3);
        assert_eq!(config.workflows.retry_backoff, Duration::from_millis(500));
        // Defaults used when neither specifies
        assert_eq!(config.workflows.max_replies, 10);
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let cli = CliConfig::default();
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_db_dir_not_directory_error() {
        // Create a temporary file (not a directory)
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_file.path().to_path_buf()),
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_missing_api_key_error() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("api_key must be specified"));
    }

    #[test]
    fn test_resolve_token_source_command() {
        let temp_dir = make_temp_db_dir();
        let cli = cli_with_db(&temp_dir);
        let file_config = FileConfig {
            youtube: Some(YouTubeConfig {
                access_token_command: Some("print-token".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        assert!(matches!(
            config.youtube.token_source,
            TokenSource::Command(ref c) if c == "print-token"
        ));
    }

    #[test]
    fn test_resolve_token_and_command_conflict() {
        let temp_dir = make_temp_db_dir();
        let mut cli = cli_with_db(&temp_dir);
        cli.access_token = Some("static".to_string());
        let file_config = FileConfig {
            youtube: Some(YouTubeConfig {
                access_token_command: Some("print-token".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let result = AppConfig::resolve(&cli, Some(file_config));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("mutually exclusive"));
    }

    #[test]
    fn test_resolve_no_token_source() {
        let temp_dir = make_temp_db_dir();
        let cli = cli_with_db(&temp_dir);
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(matches!(config.youtube.token_source, TokenSource::None));
    }

    #[test]
    fn test_resolve_zero_page_size_error() {
        let temp_dir = make_temp_db_dir();
        let cli = cli_with_db(&temp_dir);
        let file_config = FileConfig {
            workflows: Some(WorkflowsConfig {
                page_size: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };

        let result = AppConfig::resolve(&cli, Some(file_config));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("page_size"));
    }

    #[test]
    fn test_songs_db_path() {
        let temp_dir = make_temp_db_dir();
        let cli = cli_with_db(&temp_dir);
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.songs_db_path(), temp_dir.path().join("songs.db"));
    }
}
