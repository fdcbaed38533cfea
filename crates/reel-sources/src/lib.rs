//! Content sources for the reel pipeline.
//!
//! Each external provider sits behind [`ContentSource`] and paces itself
//! with its own [`RateLimiter`]. [`ContentAggregator`] picks sources per
//! niche, fans out, and merges the results.

pub mod aggregator;
pub mod convert;
pub mod error;
pub mod hackernews;
pub mod http;
pub mod openlibrary;
pub mod rate_limit;
pub mod reddit;
pub mod source;
pub mod wikipedia;

pub use aggregator::{dedup_and_rank, items_per_source, source_priority, AggregatorConfig, ContentAggregator};
pub use convert::{content_to_script, DEFAULT_MAX_SCENES, DEFAULT_WORDS_PER_SCENE};
pub use error::{SourceError, SourceResult};
pub use hackernews::HackerNewsSource;
pub use openlibrary::OpenLibrarySource;
pub use rate_limit::RateLimiter;
pub use reddit::RedditSource;
pub use source::{ContentSource, SourceCapabilities, SourceSettings};
pub use wikipedia::WikipediaSource;
