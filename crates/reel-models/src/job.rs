//! Job identity, lifecycle status and per-script results.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::niche::Platform;

/// Unique identifier for a job attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline status of a job.
///
/// The orchestrator moves a job through these states one stage at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Scraping,
    Enhancing,
    GeneratingImages,
    GeneratingAudio,
    AssemblingVideo,
    GeneratingThumbnails,
    GeneratingSubtitles,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Scraping => "scraping",
            JobStatus::Enhancing => "enhancing",
            JobStatus::GeneratingImages => "generating_images",
            JobStatus::GeneratingAudio => "generating_audio",
            JobStatus::AssemblingVideo => "assembling_video",
            JobStatus::GeneratingThumbnails => "generating_thumbnails",
            JobStatus::GeneratingSubtitles => "generating_subtitles",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Check if the job is actively running a stage.
    pub fn is_active(&self) -> bool {
        !matches!(self, JobStatus::Pending) && !self.is_terminal()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of processing one script.
///
/// `success` is false whenever any error was recorded, even if the job
/// reached a terminal status with partial output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    pub script_path: Option<PathBuf>,
    #[serde(default)]
    pub video_paths: BTreeMap<Platform, PathBuf>,
    #[serde(default)]
    pub thumbnail_paths: Vec<PathBuf>,
    #[serde(default)]
    pub subtitle_paths: BTreeMap<Platform, PathBuf>,
    #[serde(default)]
    pub errors: Vec<String>,
    /// Failures of optional stages; these do not affect `success`.
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub duration_seconds: f64,
}

impl JobResult {
    /// Build a failed result carrying a single error.
    pub fn failed(error: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            success: false,
            errors: vec![error.into()],
            status: JobStatus::Failed,
            duration_seconds,
            ..Default::default()
        }
    }
}
