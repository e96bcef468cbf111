mod openai;
mod types;

pub use openai::OpenAiGenerator;
pub use types::{
    normalize_tags, ContentAnalysis, ReplyContext, Sentiment, SentimentLabel, MAX_TAGS,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Request timed out")]
    Timeout,
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl EnrichError {
    pub fn is_transient(&self) -> bool {
        match self {
            EnrichError::Timeout | EnrichError::Connection(_) | EnrichError::RateLimited => true,
            EnrichError::Api { status, .. } => *status >= 500,
            EnrichError::InvalidResponse(_) => false,
        }
    }
}

/// AI content gateway. Every operation is advisory: callers have a
/// non-AI fallback for each one, so failures here degrade rather than
/// abort a workflow.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Inspect a song asset (by URL) for genre, mood and themes.
    async fn analyze_content(&self, source_url: &str) -> Result<ContentAnalysis, EnrichError>;

    /// Write a listing description for the song.
    async fn generate_description(
        &self,
        title: &str,
        analysis: &ContentAnalysis,
    ) -> Result<String, EnrichError>;

    /// Suggest search tags. Callers normalize with [`normalize_tags`].
    async fn suggest_tags(&self, title: &str, genre: &str) -> Result<Vec<String>, EnrichError>;

    async fn analyze_sentiment(&self, comment_text: &str) -> Result<Sentiment, EnrichError>;

    /// Draft a reply to a viewer comment. May return an empty string when
    /// no reply is warranted.
    async fn generate_reply(
        &self,
        comment_text: &str,
        context: &ReplyContext,
    ) -> Result<String, EnrichError>;
}
