use crate::store::SongStore;
use crate::workflows::{CommentEngine, UploadEngine};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context provided to jobs during execution.
///
/// Contains references to shared resources and a cancellation token
/// for graceful shutdown handling.
#[derive(Clone)]
pub struct JobContext {
    /// Token to check for cancellation/shutdown requests.
    pub cancellation_token: CancellationToken,

    /// Access to the song/video/feedback database.
    pub store: Arc<dyn SongStore>,

    pub upload_engine: Arc<UploadEngine>,

    pub comment_engine: Arc<CommentEngine>,

    /// Most songs one upload batch takes on.
    pub upload_limit: usize,

    /// Reply budget for one comment sweep.
    pub max_replies: usize,

    /// Activity log entries older than this get pruned.
    pub activity_retention_days: i64,
}

impl JobContext {
    pub fn new(
        cancellation_token: CancellationToken,
        store: Arc<dyn SongStore>,
        upload_engine: Arc<UploadEngine>,
        comment_engine: Arc<CommentEngine>,
        upload_limit: usize,
        max_replies: usize,
        activity_retention_days: i64,
    ) -> Self {
        Self {
            cancellation_token,
            store,
            upload_engine,
            comment_engine,
            upload_limit,
            max_replies,
            activity_retention_days,
        }
    }

    /// Check if cancellation has been requested.
    ///
    /// Jobs should periodically check this during long-running operations
    /// and return early with `JobError::Cancelled` if true.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
