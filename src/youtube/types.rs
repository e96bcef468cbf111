use serde::Serialize;

/// A top-level viewer comment on one of our videos.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: String,
    pub video_id: String,
    pub text: String,
    pub author: String,
    pub published_at: Option<String>,
    /// True when one of the existing replies came from our own channel.
    pub has_our_reply: bool,
}

/// Everything the platform needs to publish one song.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub source_url: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Snapshot of the client-side quota ledger. Units mirror the platform's
/// published costs; `remaining` going negative is clamped to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuotaStatus {
    pub used: u64,
    pub remaining: u64,
    pub daily_limit: u64,
}
