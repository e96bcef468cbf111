//! OpenAI-compatible chat-completions backend for content enrichment.
//!
//! Works with OpenAI or any service implementing the same API. Structured
//! answers (analysis, sentiment) are requested as JSON and parsed
//! leniently: models love to wrap JSON in code fences.

use super::types::{ContentAnalysis, ReplyContext, Sentiment, SentimentLabel};
use super::{ContentGenerator, EnrichError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl OpenAiGenerator {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            request_timeout,
        }
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, EnrichError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: Some(0.7),
        };

        debug!(model = %self.model, "Sending completion request");

        let mut req_builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EnrichError::Timeout
                } else {
                    EnrichError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(EnrichError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EnrichError::InvalidResponse("No choices in response".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

/// Strip a Markdown code fence if the whole payload is wrapped in one.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };
    // Drop an optional language marker on the first line.
    match inner.split_once('\n') {
        Some((first, rest)) if !first.trim().contains(' ') => rest.trim(),
        _ => inner.trim(),
    }
}

fn parse_analysis(text: &str) -> Result<ContentAnalysis, EnrichError> {
    serde_json::from_str(strip_code_fence(text))
        .map_err(|e| EnrichError::InvalidResponse(format!("Bad analysis payload: {}", e)))
}

fn parse_sentiment(text: &str) -> Result<Sentiment, EnrichError> {
    #[derive(Deserialize)]
    struct RawSentiment {
        label: String,
        #[serde(default)]
        confidence: Option<f64>,
    }

    let raw: RawSentiment = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| EnrichError::InvalidResponse(format!("Bad sentiment payload: {}", e)))?;
    let label = SentimentLabel::parse(&raw.label)
        .ok_or_else(|| EnrichError::InvalidResponse(format!("Unknown label {:?}", raw.label)))?;
    Ok(Sentiment {
        label,
        confidence: raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
    })
}

fn parse_tags(text: &str) -> Vec<String> {
    let stripped = strip_code_fence(text);
    // Either a JSON array or a comma-separated line.
    if let Ok(tags) = serde_json::from_str::<Vec<String>>(stripped) {
        return tags;
    }
    stripped
        .split(',')
        .map(|t| t.trim().trim_matches('"').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    async fn analyze_content(&self, source_url: &str) -> Result<ContentAnalysis, EnrichError> {
        let system = "You are a music analyst. Respond with a JSON object with keys \
                      \"genre\" (string), \"mood\" (string) and \"themes\" (array of strings). \
                      No prose.";
        let user = format!("Analyze the song published at this URL: {}", source_url);
        let content = self.chat(system, &user).await?;
        parse_analysis(&content)
    }

    async fn generate_description(
        &self,
        title: &str,
        analysis: &ContentAnalysis,
    ) -> Result<String, EnrichError> {
        let system = "You write short, engaging YouTube descriptions for music uploads. \
                      Two or three sentences, no hashtags.";
        let user = format!(
            "Title: {}\nGenre: {}\nMood: {}\nThemes: {}",
            title,
            analysis.genre.as_deref().unwrap_or("unknown"),
            analysis.mood.as_deref().unwrap_or("unknown"),
            analysis.themes.join(", "),
        );
        let description = self.chat(system, &user).await?;
        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(EnrichError::InvalidResponse(
                "Empty description".to_string(),
            ));
        }
        Ok(description)
    }

    async fn suggest_tags(&self, title: &str, genre: &str) -> Result<Vec<String>, EnrichError> {
        let system = "You suggest YouTube search tags for music uploads. Respond with a \
                      JSON array of short strings. No prose.";
        let user = format!("Title: {}\nGenre: {}", title, genre);
        let content = self.chat(system, &user).await?;
        Ok(parse_tags(&content))
    }

    async fn analyze_sentiment(&self, comment_text: &str) -> Result<Sentiment, EnrichError> {
        let system = "Classify the sentiment of a viewer comment. Respond with a JSON \
                      object with keys \"label\" (positive|negative|neutral) and \
                      \"confidence\" (0..1). No prose.";
        let content = self.chat(system, comment_text).await?;
        parse_sentiment(&content)
    }

    async fn generate_reply(
        &self,
        comment_text: &str,
        context: &ReplyContext,
    ) -> Result<String, EnrichError> {
        let system = "You are the artist replying to viewer comments on your own music \
                      videos. Be warm and brief (one or two sentences). If the comment \
                      needs no reply, respond with an empty string.";
        let user = format!(
            "Video: {}{}\nComment: {}",
            context.song_title,
            context
                .song_style
                .as_deref()
                .map(|s| format!(" ({})", s))
                .unwrap_or_default(),
            comment_text,
        );
        let reply = self.chat(system, &user).await?;
        Ok(reply.trim().to_string())
    }
}

// Chat completions API types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
