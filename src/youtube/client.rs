//! YouTube Data API v3 client.
//!
//! Covers the three calls the workflows need: multipart video upload,
//! commentThreads listing, and comment replies. Quota is tracked with a
//! client-side unit ledger so batches can stop before the platform starts
//! rejecting writes.

use super::types::{Comment, QuotaStatus, UploadRequest};
use super::{PlatformError, VideoPlatform};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Timeout for access_token_command execution.
const TOKEN_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Published unit costs (https://developers.google.com/youtube/v3/determine_quota_cost).
const UPLOAD_COST: u64 = 1600;
const COMMENT_WRITE_COST: u64 = 50;
const LIST_COST: u64 = 1;

/// Source of the OAuth access token used for writes.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// No token; only key-authenticated reads will work.
    None,
    /// Static access token.
    Static(String),
    /// Shell command that outputs the token (for rotating credentials).
    Command(String),
}

impl TokenSource {
    async fn get_token(&self) -> Result<Option<String>, PlatformError> {
        match self {
            TokenSource::None => Ok(None),
            TokenSource::Static(token) => Ok(Some(token.clone())),
            TokenSource::Command(cmd) => {
                debug!(command = %cmd, "Fetching access token via command");

                let result = tokio::time::timeout(
                    TOKEN_COMMAND_TIMEOUT,
                    Command::new("sh").arg("-c").arg(cmd).output(),
                )
                .await;

                let output = match result {
                    Ok(Ok(output)) => output,
                    Ok(Err(e)) => {
                        warn!(command = %cmd, error = %e, "access_token_command failed to execute");
                        return Err(PlatformError::Connection(format!(
                            "Failed to execute access_token_command: {}",
                            e
                        )));
                    }
                    Err(_) => {
                        warn!(command = %cmd, "access_token_command timed out");
                        return Err(PlatformError::Timeout);
                    }
                };

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    warn!(command = %cmd, stderr = %stderr, "access_token_command failed");
                    return Err(PlatformError::Auth(format!(
                        "access_token_command failed with status {}: {}",
                        output.status, stderr
                    )));
                }

                let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if token.is_empty() {
                    return Err(PlatformError::Auth(
                        "access_token_command returned empty token".to_string(),
                    ));
                }

                Ok(Some(token))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct YouTubeClientConfig {
    pub api_key: String,
    pub token_source: TokenSource,
    /// Our own channel id, used to recognize replies we already posted.
    pub channel_id: Option<String>,
    pub daily_quota_units: u64,
    pub request_timeout: Duration,
}

/// The ledger resets when the UTC day rolls over, matching the platform's
/// quota window.
struct QuotaLedger {
    day: NaiveDate,
    used: u64,
}

pub struct YouTubeClient {
    client: Client,
    base_url: String,
    upload_base_url: String,
    config: YouTubeClientConfig,
    ledger: Mutex<QuotaLedger>,
}

impl YouTubeClient {
    pub fn new(config: YouTubeClientConfig) -> Self {
        Self::with_base_urls(
            config,
            "https://www.googleapis.com/youtube/v3",
            "https://www.googleapis.com/upload/youtube/v3",
        )
    }

    /// Exposed so tests can point the client at a local server.
    pub fn with_base_urls(
        config: YouTubeClientConfig,
        base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            upload_base_url: upload_base_url.into(),
            ledger: Mutex::new(QuotaLedger {
                day: Utc::now().date_naive(),
                used: 0,
            }),
            config,
        }
    }

    fn ledger_snapshot(&self) -> QuotaStatus {
        let mut ledger = match self.ledger.lock() {
            Ok(ledger) => ledger,
            Err(poisoned) => poisoned.into_inner(),
        };
        let today = Utc::now().date_naive();
        if ledger.day != today {
            ledger.day = today;
            ledger.used = 0;
        }
        QuotaStatus {
            used: ledger.used,
            remaining: self.config.daily_quota_units.saturating_sub(ledger.used),
            daily_limit: self.config.daily_quota_units,
        }
    }

    fn charge(&self, units: u64) {
        let mut ledger = match self.ledger.lock() {
            Ok(ledger) => ledger,
            Err(poisoned) => poisoned.into_inner(),
        };
        let today = Utc::now().date_naive();
        if ledger.day != today {
            ledger.day = today;
            ledger.used = 0;
        }
        ledger.used += units;
    }

    async fn bearer_token(&self) -> Result<String, PlatformError> {
        self.config
            .token_source
            .get_token()
            .await?
            .ok_or_else(|| PlatformError::Auth("no access token configured".to_string()))
    }

    /// Fetch the rendered asset from its signed URL. Expired links come
    /// back as 403/404/410.
    async fn fetch_source(&self, source_url: &str) -> Result<Vec<u8>, PlatformError> {
        let response = self
            .client
            .get(source_url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlatformError::Timeout
                } else {
                    PlatformError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if matches!(status.as_u16(), 403 | 404 | 410) {
            return Err(PlatformError::UrlExpired);
        }
        if !status.is_success() {
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message: format!("source fetch failed for {}", source_url),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PlatformError::Connection(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn map_error_response(status: u16, body: &str) -> PlatformError {
        if status == 429 {
            return PlatformError::RateLimited;
        }
        // Quota exhaustion hides behind 403 with a reason string.
        if body.contains("uploadLimitExceeded")
            || body.contains("quotaExceeded")
            || body.contains("dailyLimitExceeded")
        {
            return PlatformError::QuotaExceeded;
        }
        if status == 401 {
            return PlatformError::Auth(body.to_string());
        }
        PlatformError::Api {
            status,
            message: body.to_string(),
        }
    }
}

#[async_trait]
impl VideoPlatform for YouTubeClient {
    async fn upload_video(&self, request: &UploadRequest) -> Result<String, PlatformError> {
        let quota = self.ledger_snapshot();
        if quota.remaining < UPLOAD_COST {
            debug!(used = quota.used, limit = quota.daily_limit, "Upload blocked by quota ledger");
            return Err(PlatformError::QuotaExceeded);
        }

        let media = self.fetch_source(&request.source_url).await?;
        let token = self.bearer_token().await?;

        let metadata = serde_json::json!({
            "snippet": {
                "title": request.title,
                "description": request.description,
                "tags": request.tags,
                "categoryId": "10",
            },
            "status": { "privacyStatus": "public" },
        });

        let form = Form::new()
            .part(
                "metadata",
                Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?,
            )
            .part(
                "media",
                Part::bytes(media)
                    .mime_str("video/*")
                    .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?,
            );

        let url = format!(
            "{}/videos?uploadType=multipart&part=snippet,status",
            self.upload_base_url
        );

        debug!(title = %request.title, "Uploading video");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlatformError::Timeout
                } else {
                    PlatformError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_error_response(status.as_u16(), &body));
        }

        let uploaded: VideoResource = response.json().await.map_err(|e| {
            PlatformError::InvalidResponse(format!("Failed to parse upload response: {}", e))
        })?;

        self.charge(UPLOAD_COST);
        Ok(uploaded.id)
    }

    async fn fetch_comments(
        &self,
        video_id: &str,
        max_results: usize,
    ) -> Result<Vec<Comment>, PlatformError> {
        let url = format!(
            "{}/commentThreads?part=snippet,replies&videoId={}&maxResults={}&textFormat=plainText&key={}",
            self.base_url, video_id, max_results, self.config.api_key
        );

        let response = self
            .client
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlatformError::Timeout
                } else {
                    PlatformError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        // Comments disabled (403) or video gone (404): nothing to process.
        if matches!(status.as_u16(), 403 | 404) {
            debug!(video_id = %video_id, status = status.as_u16(), "No comments available");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_error_response(status.as_u16(), &body));
        }

        let listing: CommentThreadListResponse = response.json().await.map_err(|e| {
            PlatformError::InvalidResponse(format!("Failed to parse comment listing: {}", e))
        })?;

        self.charge(LIST_COST);

        let our_channel = self.config.channel_id.as_deref();
        let comments = listing
            .items
            .into_iter()
            .map(|thread| {
                let top = thread.snippet.top_level_comment;
                let has_our_reply = thread
                    .replies
                    .map(|r| {
                        r.comments.iter().any(|reply| {
                            match (&reply.snippet.author_channel_id, our_channel) {
                                (Some(author), Some(ours)) => author.value == ours,
                                _ => false,
                            }
                        })
                    })
                    .unwrap_or(false);
                Comment {
                    id: top.id,
                    video_id: video_id.to_string(),
                    text: top.snippet.text_display,
                    author: top.snippet.author_display_name,
                    published_at: top.snippet.published_at,
                    has_our_reply,
                }
            })
            .collect();

        Ok(comments)
    }

    async fn reply_to_comment(
        &self,
        comment_id: &str,
        text: &str,
    ) -> Result<String, PlatformError> {
        let quota = self.ledger_snapshot();
        if quota.remaining < COMMENT_WRITE_COST {
            return Err(PlatformError::QuotaExceeded);
        }

        let token = self.bearer_token().await?;
        let url = format!("{}/comments?part=snippet", self.base_url);
        let body = serde_json::json!({
            "snippet": {
                "parentId": comment_id,
                "textOriginal": text,
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlatformError::Timeout
                } else {
                    PlatformError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_error_response(status.as_u16(), &body));
        }

        let reply: CommentResource = response.json().await.map_err(|e| {
            PlatformError::InvalidResponse(format!("Failed to parse reply response: {}", e))
        })?;

        self.charge(COMMENT_WRITE_COST);
        Ok(reply.id)
    }

    async fn check_quota(&self) -> Result<QuotaStatus, PlatformError> {
        Ok(self.ledger_snapshot())
    }
}

// YouTube API types

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CommentThreadListResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: CommentThreadSnippet,
    replies: Option<CommentReplies>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: CommentResourceFull,
}

#[derive(Debug, Deserialize)]
struct CommentReplies {
    #[serde(default)]
    comments: Vec<CommentResourceFull>,
}

#[derive(Debug, Deserialize)]
struct CommentResourceFull {
    id: String,
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_display: String,
    #[serde(default)]
    author_display_name: String,
    published_at: Option<String>,
    author_channel_id: Option<AuthorChannelId>,
}

#[derive(Debug, Deserialize)]
struct AuthorChannelId {
    value: String,
}

#[derive(Debug, Deserialize)]
struct CommentResource {
    id: String,
}
