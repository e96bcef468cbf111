use super::summary::UploadSummary;
use super::{WorkflowError, DEFAULT_RETRY_BACKOFF, MAX_ATTEMPTS};
use crate::enrichment::{normalize_tags, ContentGenerator};
use crate::server::metrics;
use crate::store::{ActivityLevel, Song, SongStatus, SongStore};
use crate::youtube::{PlatformError, UploadRequest, VideoPlatform};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// When false, metadata enrichment is skipped entirely and the
    /// fallback description/tags are used.
    pub auto_metadata: bool,
    pub retry_backoff: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            auto_metadata: true,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Drains the pending-song queue onto the video platform, oldest first.
///
/// Per-item failures mark the song and move on; a quota signal aborts the
/// rest of the batch because every later upload would hit the same wall.
pub struct UploadEngine {
    store: Arc<dyn SongStore>,
    platform: Arc<dyn VideoPlatform>,
    generator: Arc<dyn ContentGenerator>,
    settings: UploadSettings,
}

impl UploadEngine {
    pub fn new(
        store: Arc<dyn SongStore>,
        platform: Arc<dyn VideoPlatform>,
        generator: Arc<dyn ContentGenerator>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            store,
            platform,
            generator,
            settings,
        }
    }

    pub async fn run(
        &self,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<UploadSummary, WorkflowError> {
        let started = Instant::now();
        let result = self.run_inner(limit, cancel).await;
        let status = match &result {
            Ok(summary) if summary.quota_aborted => "quota_aborted",
            Ok(_) => "completed",
            Err(_) => "failed",
        };
        metrics::record_workflow_run("upload", status, started.elapsed().as_secs_f64());
        result
    }

    async fn run_inner(
        &self,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<UploadSummary, WorkflowError> {
        let songs = self.store.list_pending_songs(limit)?;
        let mut summary = UploadSummary::default();

        if songs.is_empty() {
            info!("No pending songs to upload");
            return Ok(summary);
        }

        info!(count = songs.len(), "Starting upload batch");
        let total = songs.len();

        for (index, song) in songs.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.skipped += total - index;
                summary.note("cancelled, remaining songs left pending");
                break;
            }

            summary.attempted += 1;

            let Some(source_url) = song.source_url.as_deref() else {
                self.mark_terminal(song, SongStatus::Failed, "no source url", &mut summary);
                continue;
            };

            let (description, tags) = self.build_metadata(song).await;
            let request = UploadRequest {
                source_url: source_url.to_string(),
                title: song.title.clone(),
                description,
                tags,
            };

            match self.upload_with_retries(&request).await {
                Ok(video_id) => {
                    self.commit_upload(song, &video_id, &mut summary).await;
                }
                Err(PlatformError::UrlExpired) => {
                    self.mark_terminal(song, SongStatus::UrlExpired, "source url expired", &mut summary);
                }
                Err(PlatformError::QuotaExceeded) => {
                    // Deterministic for the rest of the day; the current
                    // song stays pending for the next batch.
                    summary.quota_aborted = true;
                    summary.skipped += total - index - 1;
                    summary.note(format!("song {}: quota exceeded, batch aborted", song.id));
                    self.log_best_effort(
                        ActivityLevel::Warn,
                        &format!("upload batch aborted on quota after {} songs", index),
                    );
                    warn!(song_id = %song.id, "Quota exceeded, aborting upload batch");
                    break;
                }
                Err(e) => {
                    self.mark_terminal(
                        song,
                        SongStatus::Failed,
                        &format!("upload failed: {}", e),
                        &mut summary,
                    );
                }
            }
        }

        info!(
            uploaded = summary.uploaded,
            failed = summary.failed,
            url_expired = summary.url_expired,
            skipped = summary.skipped,
            "Upload batch finished"
        );
        Ok(summary)
    }

    async fn upload_with_retries(&self, request: &UploadRequest) -> Result<String, PlatformError> {
        let mut attempt = 1;
        loop {
            match self.platform.upload_video(request).await {
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        title = %request.title,
                        attempt,
                        error = %e,
                        "Transient upload failure, retrying"
                    );
                    attempt += 1;
                    sleep(self.settings.retry_backoff).await;
                }
                other => return other,
            }
        }
    }

    /// The commit point: once the platform accepted the upload, the local
    /// status write is all that remains. It gets its own retry loop, and
    /// if it still fails the video id is preserved in the activity log so
    /// an operator can reconcile by hand.
    async fn commit_upload(&self, song: &Song, video_id: &str, summary: &mut UploadSummary) {
        let mut attempt = 1;
        loop {
            match self
                .store
                .set_song_status(&song.id, SongStatus::Uploaded, Some(video_id))
            {
                Ok(()) => {
                    summary.uploaded += 1;
                    summary.note(format!("song {}: uploaded as {}", song.id, video_id));
                    metrics::record_song_upload("uploaded");
                    self.log_best_effort(
                        ActivityLevel::Info,
                        &format!("uploaded song {} as video {}", song.id, video_id),
                    );
                    return;
                }
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(song_id = %song.id, attempt, error = %e, "Status write failed, retrying");
                    attempt += 1;
                    sleep(self.settings.retry_backoff).await;
                }
                Err(e) => {
                    summary.uploaded += 1;
                    summary.note(format!(
                        "song {}: uploaded as {} (unrecorded, status write failed: {})",
                        song.id, video_id, e
                    ));
                    metrics::record_song_upload("uploaded_unrecorded");
                    self.log_best_effort(
                        ActivityLevel::Error,
                        &format!(
                            "orphaned upload: song {} is video {} but its status write failed",
                            song.id, video_id
                        ),
                    );
                    return;
                }
            }
        }
    }

    fn mark_terminal(
        &self,
        song: &Song,
        status: SongStatus,
        reason: &str,
        summary: &mut UploadSummary,
    ) {
        match status {
            SongStatus::UrlExpired => summary.url_expired += 1,
            _ => summary.failed += 1,
        }
        summary.note(format!("song {}: {}", song.id, reason));
        metrics::record_song_upload(status.as_str());
        if let Err(e) = self.store.set_song_status(&song.id, status, None) {
            summary.note(format!("song {}: status write failed: {}", song.id, e));
        }
        self.log_best_effort(
            ActivityLevel::Warn,
            &format!("song {} marked {}: {}", song.id, status, reason),
        );
    }

    async fn build_metadata(&self, song: &Song) -> (String, Vec<String>) {
        if self.settings.auto_metadata {
            if let Some(enriched) = self.try_enrich(song).await {
                return enriched;
            }
        }
        (fallback_description(song), normalize_tags(fallback_tags(song)))
    }

    async fn try_enrich(&self, song: &Song) -> Option<(String, Vec<String>)> {
        let source_url = song.source_url.as_deref()?;

        let analysis = match self.generator.analyze_content(source_url).await {
            Ok(analysis) => analysis,
            Err(e) => {
                debug!(song_id = %song.id, error = %e, "Content analysis failed, using fallback metadata");
                return None;
            }
        };

        let description = match self.generator.generate_description(&song.title, &analysis).await {
            Ok(description) => description,
            Err(e) => {
                debug!(song_id = %song.id, error = %e, "Description generation failed, using fallback metadata");
                return None;
            }
        };

        let genre = analysis.genre.as_deref().unwrap_or("music");
        let tags = match self.generator.suggest_tags(&song.title, genre).await {
            Ok(tags) => tags,
            Err(e) => {
                debug!(song_id = %song.id, error = %e, "Tag suggestion failed, using fallback tags");
                fallback_tags(song)
            }
        };

        Some((description, normalize_tags(tags)))
    }

    fn log_best_effort(&self, level: ActivityLevel, message: &str) {
        if let Err(e) = self.store.log_activity(level, message) {
            warn!(error = %e, "Failed to write activity log entry");
        }
    }
}

fn fallback_description(song: &Song) -> String {
    if let Some(description) = &song.description {
        if !description.trim().is_empty() {
            return description.clone();
        }
    }
    let mut out = song.title.clone();
    if let Some(style) = &song.style {
        out.push_str(&format!(" ({})", style));
    }
    if let Some(lyrics) = &song.lyrics {
        if !lyrics.trim().is_empty() {
            out.push_str("\n\nLyrics:\n");
            out.push_str(lyrics);
        }
    }
    out
}

fn fallback_tags(song: &Song) -> Vec<String> {
    let mut tags = vec!["music".to_string(), "original".to_string()];
    if let Some(style) = &song.style {
        tags.extend(style.split([',', '/']).map(|s| s.trim().to_string()));
    }
    tags
}
