//! Shared data models for the reel pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, job status and job results
//! - Niches and output platforms
//! - Scripts, scenes and visual style hints
//! - Resume checkpoints
//! - Raw content pulled from external sources

pub mod checkpoint;
pub mod content;
pub mod error;
pub mod job;
pub mod niche;
pub mod script;
pub mod utils;

// Re-export common types
pub use checkpoint::{Checkpoint, Stage, StageOutcome};
pub use content::{ContentSourceType, RawContent, MIN_CONTENT_WORDS};
pub use error::{ModelError, ModelResult};
pub use job::{JobId, JobResult, JobStatus};
pub use niche::{Niche, Platform};
pub use script::{Scene, Script, VisualStyle};
pub use utils::{normalize_title, slugify};
