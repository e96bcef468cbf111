mod models;
mod sqlite_song_store;

pub use models::{ActivityLevel, FeedbackRecord, NewSong, Song, SongStatus, Video};
pub use sqlite_song_store::SqliteSongStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("store unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

impl StoreError {
    /// Only `Unavailable` is worth retrying; the other variants describe
    /// the data, not the connection.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Persistence gateway for the publishing pipeline. Calls are synchronous;
/// the backing SQLite handle is cheap and local, and callers that live on
/// the async runtime hold the store behind an `Arc`.
pub trait SongStore: Send + Sync {
    /// Pending songs, oldest first (`created_at`, then id as tiebreaker).
    fn list_pending_songs(&self, limit: usize) -> Result<Vec<Song>, StoreError>;

    fn get_song(&self, song_id: &str) -> Result<Song, StoreError>;

    /// Flip a pending song to a terminal status. `video_id` must be
    /// present exactly when `status` is `Uploaded`, and in that case the
    /// matching `Video` row is written in the same transaction. Songs
    /// already in a terminal state are rejected with `InvalidTransition`.
    fn set_song_status(
        &self,
        song_id: &str,
        status: SongStatus,
        video_id: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Uploaded videos, most recent first.
    fn list_uploaded_videos(&self, limit: usize) -> Result<Vec<Video>, StoreError>;

    fn has_feedback(&self, video_id: &str, comment_id: &str) -> Result<bool, StoreError>;

    /// Record a processed comment. A second insert for the same
    /// `(video_id, comment_id)` fails with `Conflict` and leaves the
    /// original row untouched.
    fn save_feedback(
        &self,
        video_id: &str,
        comment_id: &str,
        comment_text: &str,
        sentiment: &str,
    ) -> Result<(), StoreError>;

    /// Append-only operational trace. Callers treat failures here as
    /// non-fatal.
    fn log_activity(&self, level: ActivityLevel, message: &str) -> Result<(), StoreError>;

    fn count_songs_by_status(&self) -> Result<Vec<(SongStatus, u64)>, StoreError>;

    /// Delete activity entries older than `before` (RFC3339); returns how
    /// many rows went away.
    fn prune_activity_log(&self, before: &str) -> Result<usize, StoreError>;
}
