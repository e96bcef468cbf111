use serde::{Deserialize, Serialize};

/// Lifecycle state of a song in the publishing pipeline.
///
/// `Pending` is the only state the upload workflow picks up; the other
/// three are terminal. There is no transition back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongStatus {
    Pending,
    Uploaded,
    Failed,
    UrlExpired,
}

impl SongStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SongStatus::Pending => "pending",
            SongStatus::Uploaded => "uploaded",
            SongStatus::Failed => "failed",
            SongStatus::UrlExpired => "url_expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SongStatus::Pending),
            "uploaded" => Some(SongStatus::Uploaded),
            "failed" => Some(SongStatus::Failed),
            "url_expired" => Some(SongStatus::UrlExpired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SongStatus::Pending)
    }
}

impl std::fmt::Display for SongStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub style: Option<String>,
    pub lyrics: Option<String>,
    pub description: Option<String>,
    /// Where the rendered audio/video asset can be fetched from. Signed
    /// URLs expire, which is why `UrlExpired` is a distinct terminal state.
    pub source_url: Option<String>,
    pub status: SongStatus,
    pub video_id: Option<String>,
    /// RFC3339.
    pub created_at: String,
}

/// Insert payload for a song row; id and timestamps are assigned by the
/// store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSong {
    pub title: String,
    pub style: Option<String>,
    pub lyrics: Option<String>,
    pub description: Option<String>,
    pub source_url: Option<String>,
}

/// A song that made it onto the platform. Written in the same transaction
/// that flips the song to `Uploaded`, so a row here always has a matching
/// `Uploaded` song.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Video {
    pub video_id: String,
    pub song_id: String,
    pub title: String,
    /// RFC3339.
    pub uploaded_at: String,
}

/// One processed viewer comment. `(video_id, comment_id)` is unique; the
/// row doubles as the idempotency marker for the comment workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRecord {
    pub video_id: String,
    pub comment_id: String,
    pub comment_text: String,
    pub sentiment: String,
    /// RFC3339.
    pub processed_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    Info,
    Warn,
    Error,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Info => "info",
            ActivityLevel::Warn => "warn",
            ActivityLevel::Error => "error",
        }
    }
}
