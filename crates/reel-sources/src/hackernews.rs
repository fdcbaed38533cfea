//! Hacker News Firebase API.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::DateTime;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use reel_models::{ContentSourceType, Niche, RawContent};

use crate::error::SourceResult;
use crate::http::{build_client, get_json, log_score};
use crate::rate_limit::RateLimiter;
use crate::source::{ContentSource, SourceCapabilities, SourceSettings};

pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";
const SCORE_FACTOR: f64 = 30.0;
/// Stories scanned per requested result, to leave room for keyword filtering.
const SCAN_FACTOR: usize = 5;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Title/text keywords that place a story in a niche.
pub fn niche_keywords(niche: Niche) -> &'static [&'static str] {
    match niche {
        Niche::TechGadgets => &["technology", "gadget", "hardware", "device", "smartphone", "computer"],
        Niche::AiFutureTech => &[
            "ai",
            "artificial intelligence",
            "machine learning",
            "gpt",
            "llm",
            "neural",
            "robot",
            "future",
            "automation",
        ],
        Niche::Finance => &["finance", "stock", "crypto", "bitcoin", "economy", "startup", "vc", "funding"],
        Niche::Philosophy => &["philosophy", "ethics", "consciousness", "mind", "existence"],
        Niche::SpaceAstronomy => &["space", "nasa", "mars", "rocket", "satellite", "astronomy", "telescope"],
        _ => &[],
    }
}

/// Turn HN's HTML comment markup into plain paragraphs.
fn html_to_text(html: &str) -> String {
    let text = html.replace("<p>", "\n\n");
    let text = TAG.replace_all(&text, "");
    text.replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

#[derive(Debug, Deserialize)]
struct Item {
    id: u64,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    by: Option<String>,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    descendants: u64,
}

pub struct HackerNewsSource {
    settings: SourceSettings,
    client: Client,
    limiter: Arc<RateLimiter>,
}

impl HackerNewsSource {
    pub fn new(settings: SourceSettings) -> SourceResult<Self> {
        let client = build_client(ContentSourceType::HackerNews, &settings)?;
        let limiter = RateLimiter::per_minute("hacker_news", settings.requests_per_minute).shared();
        Ok(Self {
            settings,
            client,
            limiter,
        })
    }

    async fn top_story_ids(&self) -> SourceResult<Vec<u64>> {
        self.limiter.acquire().await;
        let ids: Option<Vec<u64>> = get_json(
            &self.client,
            ContentSourceType::HackerNews,
            &self.settings.url("topstories.json"),
            &[],
        )
        .await?;
        Ok(ids.unwrap_or_default())
    }

    /// Fetch one item. Missing or failing items are skipped by the caller.
    async fn item(&self, id: u64) -> Option<Item> {
        self.limiter.acquire().await;
        let url = self.settings.url(&format!("item/{}.json", id));
        match get_json::<Option<Item>>(&self.client, ContentSourceType::HackerNews, &url, &[]).await {
            Ok(item) => item,
            Err(e) => {
                debug!(id, error = %e, "Skipping Hacker News item");
                None
            }
        }
    }
}

fn story_to_raw_content(story: Item, niche: Niche) -> RawContent {
    let title = story.title.unwrap_or_default();
    let text = story.text.as_deref().map(html_to_text).unwrap_or_default();
    let content = if text.is_empty() {
        format!("{}. This is a link to external content.", title)
    } else {
        text
    };
    let discussion = format!("https://news.ycombinator.com/item?id={}", story.id);
    let source_url = story.url.clone().unwrap_or_else(|| discussion.clone());

    let mut item = RawContent::new(title, content, ContentSourceType::HackerNews, source_url)
        .with_score(log_score(story.score, SCORE_FACTOR));
    item.source_id = story.id.to_string();
    item.author = story.by;
    item.published_at = DateTime::from_timestamp(story.time, 0).filter(|_| story.time > 0);
    item.metadata.insert("niche".into(), json!(niche.as_str()));
    item.metadata.insert("hn_score".into(), json!(story.score));
    item.metadata.insert("comments".into(), json!(story.descendants));
    item.metadata.insert("discussion_url".into(), json!(discussion));
    if let Some(url) = story.url {
        item.metadata.insert("external_url".into(), json!(url));
    }
    item
}

fn matches_keywords(story: &Item, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let combined = format!(
        "{} {}",
        story.title.as_deref().unwrap_or_default(),
        story.text.as_deref().unwrap_or_default()
    )
    .to_lowercase();
    keywords.iter().any(|kw| combined.contains(kw.as_str()))
}

#[async_trait]
impl ContentSource for HackerNewsSource {
    fn source_type(&self) -> ContentSourceType {
        ContentSourceType::HackerNews
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            supports_search: false,
            supports_trending: true,
            requires_api_key: false,
            rate_limit_per_minute: self.settings.requests_per_minute,
            max_results_per_request: 500,
        }
    }

    fn supports_niche(&self, niche: Niche) -> bool {
        !niche_keywords(niche).is_empty()
    }

    async fn fetch_content(
        &self,
        niche: Niche,
        query: Option<&str>,
        limit: usize,
    ) -> SourceResult<Vec<RawContent>> {
        info!(niche = %niche, limit, "Fetching Hacker News content");

        let ids = self.top_story_ids().await?;

        let mut keywords: Vec<String> = Vec::new();
        if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
            keywords.push(q.to_lowercase());
        }
        keywords.extend(niche_keywords(niche).iter().map(|k| k.to_string()));

        let max_scan = ids.len().min(limit * SCAN_FACTOR);
        let mut items = Vec::new();

        for id in ids.into_iter().take(max_scan) {
            let Some(story) = self.item(id).await else {
                continue;
            };
            if story.kind != "story" || story.title.as_deref().map_or(true, str::is_empty) {
                continue;
            }
            if !matches_keywords(&story, &keywords) {
                continue;
            }
            items.push(story_to_raw_content(story, niche));
            if items.len() >= limit {
                break;
            }
        }

        items.sort_by(|a, b| b.score.total_cmp(&a.score));
        info!(niche = %niche, count = items.len(), "Hacker News fetch complete");
        Ok(items)
    }
}
