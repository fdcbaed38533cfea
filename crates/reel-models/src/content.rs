//! Raw content pulled from external sources.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::utils::normalize_title;

/// Minimum body length for content to be worth turning into a video.
pub const MIN_CONTENT_WORDS: usize = 100;

/// Kind of external content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSourceType {
    Reddit,
    Wikipedia,
    Youtube,
    News,
    HackerNews,
    OpenLibrary,
    AiGenerated,
}

impl ContentSourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSourceType::Reddit => "reddit",
            ContentSourceType::Wikipedia => "wikipedia",
            ContentSourceType::Youtube => "youtube",
            ContentSourceType::News => "news",
            ContentSourceType::HackerNews => "hacker_news",
            ContentSourceType::OpenLibrary => "open_library",
            ContentSourceType::AiGenerated => "ai_generated",
        }
    }
}

impl fmt::Display for ContentSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentSourceType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reddit" => Ok(Self::Reddit),
            "wikipedia" => Ok(Self::Wikipedia),
            "youtube" => Ok(Self::Youtube),
            "news" => Ok(Self::News),
            "hacker_news" | "hackernews" | "hn" => Ok(Self::HackerNews),
            "open_library" | "openlibrary" => Ok(Self::OpenLibrary),
            "ai_generated" => Ok(Self::AiGenerated),
            _ => Err(ModelError::UnknownSource(s.to_string())),
        }
    }
}

/// One item fetched from a content source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContent {
    pub title: String,
    /// Body text (post, article extract, story text).
    pub content: String,
    pub source_type: ContentSourceType,
    pub source_url: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    /// Engagement score normalized to 0..=100.
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RawContent {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        source_type: ContentSourceType,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            source_type,
            source_url: source_url.into(),
            source_id: String::new(),
            author: None,
            published_at: None,
            fetched_at: Utc::now(),
            score: 0.0,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the score, clamped to 0..=100.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = if score.is_finite() {
            score.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    pub fn has_sufficient_content(&self, min_words: usize) -> bool {
        self.word_count() >= min_words
    }

    /// Deduplication key.
    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }
}
