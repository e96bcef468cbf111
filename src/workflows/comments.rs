use super::summary::CommentSummary;
use super::{WorkflowError, DEFAULT_RETRY_BACKOFF, MAX_ATTEMPTS};
use crate::enrichment::{ContentGenerator, ReplyContext, Sentiment};
use crate::server::metrics;
use crate::store::{SongStore, StoreError};
use crate::youtube::{Comment, PlatformError, VideoPlatform};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CommentSettings {
    /// Most comments requested per video; clamped further by the
    /// remaining reply budget.
    pub page_size: usize,
    /// How many recently uploaded videos one sweep looks at.
    pub video_scan_limit: usize,
    pub retry_backoff: Duration,
}

impl Default for CommentSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            video_scan_limit: 50,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Sweeps viewer comments across uploaded videos, replying at most
/// `max_replies` times per run.
///
/// Two guards keep the sweep idempotent: the platform-side
/// `has_our_reply` flag and the local feedback table. A comment passing
/// both gets analyzed, maybe replied to, and recorded; the record is what
/// stops the next sweep from touching it again.
pub struct CommentEngine {
    store: Arc<dyn SongStore>,
    platform: Arc<dyn VideoPlatform>,
    generator: Arc<dyn ContentGenerator>,
    settings: CommentSettings,
}

impl CommentEngine {
    pub fn new(
        store: Arc<dyn SongStore>,
        platform: Arc<dyn VideoPlatform>,
        generator: Arc<dyn ContentGenerator>,
        settings: CommentSettings,
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
        max_replies: usize,
        cancel: &CancellationToken,
    ) -> Result<CommentSummary, WorkflowError> {
        let started = Instant::now();
        let result = self.run_inner(max_replies, cancel).await;
        let status = match &result {
            Ok(_) => "completed",
            Err(_) => "failed",
        };
        metrics::record_workflow_run("comments", status, started.elapsed().as_secs_f64());
        result
    }

    async fn run_inner(
        &self,
        max_replies: usize,
        cancel: &CancellationToken,
    ) -> Result<CommentSummary, WorkflowError> {
        let videos = self.store.list_uploaded_videos(self.settings.video_scan_limit)?;
        let mut summary = CommentSummary::default();

        if videos.is_empty() {
            info!("No uploaded videos, nothing to sweep");
            return Ok(summary);
        }

        info!(videos = videos.len(), max_replies, "Starting comment sweep");

        'videos: for video in &videos {
            if summary.replies_posted >= max_replies {
                summary.note("reply budget exhausted");
                break;
            }
            if cancel.is_cancelled() {
                summary.note("cancelled, remaining videos left unswept");
                break;
            }

            let budget = max_replies - summary.replies_posted;
            let page = budget.min(self.settings.page_size);

            let comments = match self.fetch_with_retries(&video.video_id, page).await {
                Ok(comments) => comments,
                Err(e) => {
                    summary.errors += 1;
                    summary.note(format!("video {}: comment fetch failed: {}", video.video_id, e));
                    continue;
                }
            };

            if comments.is_empty() {
                debug!(video_id = %video.video_id, "No comments to process");
                continue;
            }

            let context = self.reply_context(video);

            for comment in comments {
                if cancel.is_cancelled() {
                    summary.note("cancelled mid-video");
                    break 'videos;
                }

                summary.examined += 1;
                metrics::record_comment_examined();

                if comment.has_our_reply {
                    summary.skipped += 1;
                    continue;
                }
                match self.store.has_feedback(&video.video_id, &comment.id) {
                    Ok(true) => {
                        summary.skipped += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        // Without the guard we cannot promise idempotency
                        // for this comment, so leave it for the next sweep.
                        summary.errors += 1;
                        summary.note(format!(
                            "comment {}: dedup check failed: {}",
                            comment.id, e
                        ));
                        continue;
                    }
                }

                self.process_comment(video.video_id.as_str(), &comment, &context, &mut summary)
                    .await;
            }
        }

        info!(
            examined = summary.examined,
            replies = summary.replies_posted,
            skipped = summary.skipped,
            errors = summary.errors,
            "Comment sweep finished"
        );
        Ok(summary)
    }

    async fn process_comment(
        &self,
        video_id: &str,
        comment: &Comment,
        context: &ReplyContext,
        summary: &mut CommentSummary,
    ) {
        // Sentiment is advisory; a dead analyzer downgrades to neutral
        // rather than blocking replies.
        let sentiment = match self.generator.analyze_sentiment(&comment.text).await {
            Ok(sentiment) => sentiment,
            Err(e) => {
                debug!(comment_id = %comment.id, error = %e, "Sentiment analysis failed, recording neutral");
                Sentiment::neutral()
            }
        };

        let reply_text = match self.generator.generate_reply(&comment.text, context).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                debug!(comment_id = %comment.id, "Generator declined to reply");
                None
            }
            Err(e) => {
                summary.errors += 1;
                summary.note(format!(
                    "comment {}: reply generation failed: {}",
                    comment.id, e
                ));
                None
            }
        };

        if let Some(text) = &reply_text {
            match self.reply_with_retries(&comment.id, text).await {
                Ok(_) => {
                    summary.replies_posted += 1;
                    metrics::record_reply_posted();
                }
                Err(e) => {
                    summary.errors += 1;
                    summary.note(format!("comment {}: reply post failed: {}", comment.id, e));
                }
            }
        }

        // Recorded regardless of the reply outcome: examined once is
        // examined forever.
        match self
            .store
            .save_feedback(video_id, &comment.id, &comment.text, sentiment.label.as_str())
        {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                debug!(comment_id = %comment.id, "Feedback already recorded");
            }
            Err(e) => {
                summary.errors += 1;
                summary.note(format!(
                    "comment {}: feedback write failed: {}",
                    comment.id, e
                ));
            }
        }
    }

    fn reply_context(&self, video: &crate::store::Video) -> ReplyContext {
        let song_style = self
            .store
            .get_song(&video.song_id)
            .ok()
            .and_then(|song| song.style);
        ReplyContext {
            song_title: video.title.clone(),
            song_style,
        }
    }

    async fn fetch_with_retries(
        &self,
        video_id: &str,
        max_results: usize,
    ) -> Result<Vec<Comment>, PlatformError> {
        let mut attempt = 1;
        loop {
            match self.platform.fetch_comments(video_id, max_results).await {
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(video_id = %video_id, attempt, error = %e, "Transient fetch failure, retrying");
                    attempt += 1;
                    sleep(self.settings.retry_backoff).await;
                }
                other => return other,
            }
        }
    }

    async fn reply_with_retries(
        &self,
        comment_id: &str,
        text: &str,
    ) -> Result<String, PlatformError> {
        let mut attempt = 1;
        loop {
            match self.platform.reply_to_comment(comment_id, text).await {
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(comment_id = %comment_id, attempt, error = %e, "Transient reply failure, retrying");
                    attempt += 1;
                    sleep(self.settings.retry_backoff).await;
                }
                other => return other,
            }
        }
    }
}
