//! Scripted gateway fakes for end-to-end workflow tests.

use async_trait::async_trait;
use songflow_server::enrichment::{
    ContentAnalysis, ContentGenerator, EnrichError, ReplyContext, Sentiment, SentimentLabel,
};
use songflow_server::youtube::{
    Comment, PlatformError, QuotaStatus, UploadRequest, VideoPlatform,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Builds a top-level comment with no existing reply from us.
pub fn comment(id: &str, video_id: &str, text: &str) -> Comment {
    Comment {
        id: id.to_string(),
        video_id: video_id.to_string(),
        text: text.to_string(),
        author: "viewer".to_string(),
        published_at: Some("2026-01-01T00:00:00Z".to_string()),
        has_our_reply: false,
    }
}

/// Video platform fake. Upload outcomes can be scripted per call; when
/// the script runs dry, uploads succeed with generated ids. Comments are
/// set per video, and every reply is recorded.
#[derive(Default)]
pub struct ScriptedPlatform {
    upload_script: Mutex<VecDeque<Result<String, PlatformError>>>,
    pub uploads: Mutex<Vec<UploadRequest>>,
    comments: Mutex<HashMap<String, Vec<Comment>>>,
    pub replies: Mutex<Vec<(String, String)>>,
    upload_counter: AtomicUsize,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_upload(&self, result: Result<String, PlatformError>) {
        self.upload_script.lock().unwrap().push_back(result);
    }

    pub fn set_comments(&self, video_id: &str, comments: Vec<Comment>) {
        self.comments
            .lock()
            .unwrap()
            .insert(video_id.to_string(), comments);
    }

    pub fn uploaded_titles(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.title.clone())
            .collect()
    }

    pub fn reply_count(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl VideoPlatform for ScriptedPlatform {
    async fn upload_video(&self, request: &UploadRequest) -> Result<String, PlatformError> {
        let scripted = self.upload_script.lock().unwrap().pop_front();
        let result = match scripted {
            Some(result) => result,
            None => {
                let n = self.upload_counter.fetch_add(1, Ordering::SeqCst);
                Ok(format!("vid-{}", n))
            }
        };
        if result.is_ok() {
            self.uploads.lock().unwrap().push(request.clone());
        }
        result
    }

    async fn fetch_comments(
        &self,
        video_id: &str,
        max_results: usize,
    ) -> Result<Vec<Comment>, PlatformError> {
        let mut comments = self
            .comments
            .lock()
            .unwrap()
            .get(video_id)
            .cloned()
            .unwrap_or_default();
        comments.truncate(max_results);
        Ok(comments)
    }

    async fn reply_to_comment(
        &self,
        comment_id: &str,
        text: &str,
    ) -> Result<String, PlatformError> {
        let mut replies = self.replies.lock().unwrap();
        replies.push((comment_id.to_string(), text.to_string()));
        Ok(format!("reply-{}", replies.len()))
    }

    async fn check_quota(&self) -> Result<QuotaStatus, PlatformError> {
        Ok(QuotaStatus {
            used: 0,
            remaining: 10_000,
            daily_limit: 10_000,
        })
    }
}

/// Content generator fake with deterministic canned output.
#[derive(Default)]
pub struct CannedGenerator;

#[async_trait]
impl ContentGenerator for CannedGenerator {
    async fn analyze_content(&self, _source_url: &str) -> Result<ContentAnalysis, EnrichError> {
        Ok(ContentAnalysis {
            genre: Some("synthwave".to_string()),
            mood: Some("upbeat".to_string()),
            themes: vec!["night drives".to_string()],
        })
    }

    async fn generate_description(
        &self,
        title: &str,
        _analysis: &ContentAnalysis,
    ) -> Result<String, EnrichError> {
        Ok(format!("{} - an original synthwave track.", title))
    }

    async fn suggest_tags(&self, _title: &str, genre: &str) -> Result<Vec<String>, EnrichError> {
        Ok(vec!["music".to_string(), genre.to_string()])
    }

    async fn analyze_sentiment(&self, comment_text: &str) -> Result<Sentiment, EnrichError> {
        let label = if comment_text.contains("hate") {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Positive
        };
        Ok(Sentiment {
            label,
            confidence: 0.9,
        })
    }

    async fn generate_reply(
        &self,
        _comment_text: &str,
        context: &ReplyContext,
    ) -> Result<String, EnrichError> {
        Ok(format!("Thanks for listening to {}!", context.song_title))
    }
}
