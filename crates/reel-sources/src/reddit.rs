//! Reddit public JSON listings.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::DateTime;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use reel_models::{ContentSourceType, Niche, RawContent, MIN_CONTENT_WORDS};

use crate::error::SourceResult;
use crate::http::{build_client, get_json, log_score};
use crate::rate_limit::RateLimiter;
use crate::source::{ContentSource, SourceCapabilities, SourceSettings};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
pub const DEFAULT_MIN_SCORE: i64 = 50;
const SCORE_FACTOR: f64 = 25.0;
const MAX_LISTING_LIMIT: usize = 100;

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.+?)\*").unwrap());
static UNDERLINE_BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__(.+?)__").unwrap());
static UNDERLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(.+?)_").unwrap());
static STRIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~~(.+?)~~").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.+?)\]\(.+?\)").unwrap());
static SUPERSCRIPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\^(\S)").unwrap());
static EDIT_NOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)\n*^(edit|update):.*$").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Strip Reddit markdown and trailing edit notes from a self post.
pub fn clean_reddit_text(text: &str) -> String {
    let text = BOLD.replace_all(text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = UNDERLINE_BOLD.replace_all(&text, "$1");
    let text = UNDERLINE.replace_all(&text, "$1");
    let text = STRIKE.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    let text = SUPERSCRIPT.replace_all(&text, "$1");
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#x200B;", "");
    let text = EDIT_NOTE.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    kind: String,
    data: Post,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Post {
    id: String,
    title: String,
    selftext: String,
    author: Option<String>,
    permalink: String,
    score: i64,
    upvote_ratio: f64,
    num_comments: u64,
    over_18: bool,
    stickied: bool,
    created_utc: f64,
}

#[derive(Debug, Clone, Copy)]
enum ListingKind<'a> {
    Top,
    Hot,
    Search(&'a str),
}

/// Reddit adapter. Works without credentials and covers every niche
/// through the niche's default subreddits.
pub struct RedditSource {
    settings: SourceSettings,
    client: Client,
    limiter: Arc<RateLimiter>,
    min_score: i64,
    min_words: usize,
    time_filter: String,
}

impl RedditSource {
    pub fn new(settings: SourceSettings) -> SourceResult<Self> {
        let client = build_client(ContentSourceType::Reddit, &settings)?;
        let limiter = RateLimiter::per_minute("reddit", settings.requests_per_minute).shared();
        Ok(Self {
            settings,
            client,
            limiter,
            min_score: DEFAULT_MIN_SCORE,
            min_words: MIN_CONTENT_WORDS,
            time_filter: "week".to_string(),
        })
    }

    pub fn with_min_score(mut self, min_score: i64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_min_words(mut self, min_words: usize) -> Self {
        self.min_words = min_words;
        self
    }

    pub fn with_time_filter(mut self, time_filter: impl Into<String>) -> Self {
        self.time_filter = time_filter.into();
        self
    }

    async fn listing(&self, subreddit: &str, kind: ListingKind<'_>, limit: usize) -> SourceResult<Vec<Post>> {
        let request_limit = (limit * 2).min(MAX_LISTING_LIMIT).to_string();
        let (path, query) = match kind {
            ListingKind::Top => (
                format!("r/{}/top.json", subreddit),
                vec![("limit", request_limit), ("t", self.time_filter.clone())],
            ),
            ListingKind::Hot => (format!("r/{}/hot.json", subreddit), vec![("limit", request_limit)]),
            ListingKind::Search(q) => (
                format!("r/{}/search.json", subreddit),
                vec![
                    ("q", q.to_string()),
                    ("restrict_sr", "on".to_string()),
                    ("limit", request_limit),
                    ("t", self.time_filter.clone()),
                    ("sort", "relevance".to_string()),
                ],
            ),
        };

        self.limiter.acquire().await;
        let listing: Listing =
            get_json(&self.client, ContentSourceType::Reddit, &self.settings.url(&path), &query).await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter(|child| child.kind == "t3")
            .map(|child| child.data)
            .collect())
    }

    /// Walk the niche's subreddits, keeping usable self posts.
    async fn gather(
        &self,
        niche: Niche,
        kind: ListingKind<'_>,
        limit: usize,
        min_score: Option<i64>,
    ) -> SourceResult<Vec<RawContent>> {
        let subreddits = niche.subreddits();
        if subreddits.is_empty() {
            warn!(niche = %niche, "No subreddits configured for niche");
            return Ok(Vec::new());
        }

        info!(niche = %niche, subreddits = ?subreddits, limit, "Fetching Reddit content");

        let per_sub = (limit / subreddits.len() + 1).max(1);
        let mut items = Vec::new();
        let mut last_error = None;
        let mut any_succeeded = false;

        for subreddit in subreddits {
            let posts = match self.listing(subreddit, kind, per_sub).await {
                Ok(posts) => posts,
                Err(e) => {
                    warn!(subreddit, error = %e, "Failed to fetch from subreddit");
                    last_error = Some(e);
                    continue;
                }
            };
            any_succeeded = true;

            for post in posts {
                if post.stickied || post.over_18 || post.selftext.trim().is_empty() {
                    continue;
                }
                if min_score.is_some_and(|min| post.score < min) {
                    continue;
                }
                let item = post_to_raw_content(post, subreddit, niche);
                if item.has_sufficient_content(self.min_words) {
                    items.push(item);
                }
            }
        }

        if !any_succeeded {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        items.sort_by(|a, b| b.score.total_cmp(&a.score));
        items.truncate(limit);
        debug!(niche = %niche, count = items.len(), "Reddit fetch complete");
        Ok(items)
    }
}

fn post_to_raw_content(post: Post, subreddit: &str, niche: Niche) -> RawContent {
    let published_at = if post.created_utc > 0.0 {
        DateTime::from_timestamp(post.created_utc as i64, 0)
    } else {
        None
    };

    let mut item = RawContent::new(
        post.title,
        clean_reddit_text(&post.selftext),
        ContentSourceType::Reddit,
        format!("https://reddit.com{}", post.permalink),
    )
    .with_score(log_score(post.score, SCORE_FACTOR));
    item.source_id = post.id;
    item.author = Some(post.author.unwrap_or_else(|| "[deleted]".to_string()));
    item.published_at = published_at;
    item.metadata.insert("subreddit".into(), json!(subreddit));
    item.metadata.insert("niche".into(), json!(niche.as_str()));
    item.metadata.insert("upvotes".into(), json!(post.score));
    item.metadata.insert("upvote_ratio".into(), json!(post.upvote_ratio));
    item.metadata.insert("num_comments".into(), json!(post.num_comments));
    item
}

#[async_trait]
impl ContentSource for RedditSource {
    fn source_type(&self) -> ContentSourceType {
        ContentSourceType::Reddit
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            supports_search: true,
            supports_trending: true,
            requires_api_key: false,
            rate_limit_per_minute: self.settings.requests_per_minute,
            max_results_per_request: MAX_LISTING_LIMIT,
        }
    }

    fn supports_niche(&self, _niche: Niche) -> bool {
        true
    }

    async fn fetch_content(
        &self,
        niche: Niche,
        query: Option<&str>,
        limit: usize,
    ) -> SourceResult<Vec<RawContent>> {
        let kind = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => ListingKind::Search(q),
            None => ListingKind::Top,
        };
        self.gather(niche, kind, limit, Some(self.min_score)).await
    }

    async fn fetch_trending(&self, niche: Niche, limit: usize) -> SourceResult<Vec<RawContent>> {
        self.gather(niche, ListingKind::Hot, limit, None).await
    }
}
