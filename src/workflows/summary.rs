use serde::Serialize;

/// Outcome of one upload batch. Counts are disjoint: every selected song
/// lands in exactly one bucket. `notes` carries the ordered per-item
/// trail for operators.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadSummary {
    /// Songs the engine actually started working on.
    pub attempted: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub url_expired: usize,
    /// Songs left untouched (quota abort or cancellation).
    pub skipped: usize,
    /// True when the batch stopped early on a quota signal; the song that
    /// hit it stays pending.
    pub quota_aborted: bool,
    pub notes: Vec<String>,
}

impl UploadSummary {
    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }
}

/// Outcome of one comment sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommentSummary {
    /// Comments looked at across all videos.
    pub examined: usize,
    pub replies_posted: usize,
    /// Comments passed over by the dedup guards.
    pub skipped: usize,
    /// Per-comment or per-video failures that did not stop the sweep.
    pub errors: usize,
    pub notes: Vec<String>,
}

impl CommentSummary {
    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }
}
