use serde::{Deserialize, Serialize};

/// Maximum number of tags attached to an upload.
pub const MAX_TAGS: usize = 10;

/// Musical traits extracted from a song asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub themes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "negative" => Some(SentimentLabel::Negative),
            "neutral" => Some(SentimentLabel::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub confidence: f64,
}

impl Sentiment {
    /// The stand-in used when sentiment analysis is unavailable; comment
    /// processing carries on with it.
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            confidence: 0.5,
        }
    }
}

/// What the reply generator knows about the video under the comment.
#[derive(Debug, Clone, Default)]
pub struct ReplyContext {
    pub song_title: String,
    pub song_style: Option<String>,
}

/// Deduplicate (keeping first occurrence), drop empties, and cap at
/// [`MAX_TAGS`]. Order is otherwise preserved.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .take(MAX_TAGS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_tags_dedupes_and_caps() {
        let tags: Vec<String> = (0..15)
            .map(|i| format!("tag{}", i / 2))
            .chain(["  ".to_string(), "tag0".to_string()])
            .collect();
        let normalized = normalize_tags(tags);
        assert_eq!(normalized.len(), 8);
        assert_eq!(normalized[0], "tag0");
        assert_eq!(normalized[7], "tag7");
    }

    #[test]
    fn normalize_tags_keeps_first_occurrence_order() {
        let tags = vec![
            "Synthwave".to_string(),
            "retro".to_string(),
            "synthwave".to_string(),
        ];
        assert_eq!(normalize_tags(tags), vec!["Synthwave", "retro"]);
    }

    #[test]
    fn sentiment_label_roundtrip() {
        assert_eq!(SentimentLabel::parse(" Positive "), Some(SentimentLabel::Positive));
        assert_eq!(SentimentLabel::parse("bogus"), None);
        assert_eq!(Sentiment::neutral().label, SentimentLabel::Neutral);
        assert_eq!(Sentiment::neutral().confidence, 0.5);
    }
}
