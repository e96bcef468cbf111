mod client;
mod types;

pub use client::{TokenSource, YouTubeClient, YouTubeClientConfig};
pub use types::{Comment, QuotaStatus, UploadRequest};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Request timed out")]
    Timeout,
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Rate limited by platform")]
    RateLimited,
    #[error("Daily quota exceeded")]
    QuotaExceeded,
    #[error("Source URL expired or unreachable")]
    UrlExpired,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Platform API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid platform response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// Worth retrying with the same input. Quota and expired-URL failures
    /// are deterministic for the rest of the day / forever, so they are
    /// excluded along with auth and 4xx API errors.
    pub fn is_transient(&self) -> bool {
        match self {
            PlatformError::Timeout
            | PlatformError::Connection(_)
            | PlatformError::RateLimited => true,
            PlatformError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Video platform gateway. One implementation talks to the YouTube Data
/// API; tests script their own.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Publish a song; returns the platform video id.
    async fn upload_video(&self, request: &UploadRequest) -> Result<String, PlatformError>;

    /// Top-level comments for a video, at most `max_results`. Videos with
    /// comments disabled yield an empty list, not an error.
    async fn fetch_comments(
        &self,
        video_id: &str,
        max_results: usize,
    ) -> Result<Vec<Comment>, PlatformError>;

    /// Post a reply under a comment; returns the reply id.
    async fn reply_to_comment(
        &self,
        comment_id: &str,
        text: &str,
    ) -> Result<String, PlatformError>;

    async fn check_quota(&self) -> Result<QuotaStatus, PlatformError>;
}
