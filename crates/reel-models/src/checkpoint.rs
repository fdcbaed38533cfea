//! Resume checkpoints.
//!
//! A checkpoint records how far a job got: the coarse list of finished
//! stages plus per-scene completion flags for the scene-level stages.
//! Flags are hints only. The orchestrator re-checks that the artifact a
//! flag refers to still exists before skipping any work.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobStatus};
use crate::niche::Platform;

/// Pipeline stage names as recorded in `completed_stages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Enhance,
    Images,
    Audio,
    Videos,
    Thumbnails,
    Subtitles,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Enhance => "enhance",
            Stage::Images => "images",
            Stage::Audio => "audio",
            Stage::Videos => "videos",
            Stage::Thumbnails => "thumbnails",
            Stage::Subtitles => "subtitles",
        }
    }

    /// Status the job carries while this stage runs.
    pub fn status(&self) -> JobStatus {
        match self {
            Stage::Enhance => JobStatus::Enhancing,
            Stage::Images => JobStatus::GeneratingImages,
            Stage::Audio => JobStatus::GeneratingAudio,
            Stage::Videos => JobStatus::AssemblingVideo,
            Stage::Thumbnails => JobStatus::GeneratingThumbnails,
            Stage::Subtitles => JobStatus::GeneratingSubtitles,
        }
    }

    /// Stages that never fail a job.
    pub fn is_optional(&self) -> bool {
        matches!(self, Stage::Enhance | Stage::Thumbnails | Stage::Subtitles)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit result marker for a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    Skipped { reason: String },
    Failed { reason: String },
}

impl StageOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed)
    }
}

/// Persisted progress of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub job_id: JobId,
    /// Script this checkpoint belongs to.
    pub script_path: PathBuf,
    pub status: JobStatus,
    /// Stages fully finished, in completion order, without duplicates.
    #[serde(default)]
    pub completed_stages: Vec<Stage>,
    #[serde(default)]
    pub images_generated: BTreeSet<u32>,
    #[serde(default)]
    pub audio_generated: BTreeSet<u32>,
    #[serde(default)]
    pub videos_generated: BTreeMap<Platform, BTreeSet<u32>>,
    #[serde(default)]
    pub stage_outcomes: BTreeMap<Stage, StageOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Fresh checkpoint for a new job attempt.
    pub fn new(script_path: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new(),
            script_path: script_path.into(),
            status: JobStatus::Pending,
            completed_stages: Vec::new(),
            images_generated: BTreeSet::new(),
            audio_generated: BTreeSet::new(),
            videos_generated: BTreeMap::new(),
            stage_outcomes: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.touch();
    }

    pub fn is_stage_complete(&self, stage: Stage) -> bool {
        self.completed_stages.contains(&stage)
    }

    /// Add a stage to the completed list, keeping it duplicate free.
    pub fn mark_stage_complete(&mut self, stage: Stage) {
        if !self.completed_stages.contains(&stage) {
            self.completed_stages.push(stage);
        }
        self.touch();
    }

    /// Record how a stage ended. Completion is decided by the caller
    /// through [`Checkpoint::mark_stage_complete`].
    pub fn record_outcome(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stage_outcomes.insert(stage, outcome);
        self.touch();
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stage_outcomes.get(&stage)
    }

    pub fn mark_image_done(&mut self, scene_number: u32) {
        if self.images_generated.insert(scene_number) {
            self.touch();
        }
    }

    pub fn mark_audio_done(&mut self, scene_number: u32) {
        if self.audio_generated.insert(scene_number) {
            self.touch();
        }
    }

    pub fn mark_video_done(&mut self, platform: Platform, scene_number: u32) {
        if self
            .videos_generated
            .entry(platform)
            .or_default()
            .insert(scene_number)
        {
            self.touch();
        }
    }

    pub fn is_image_done(&self, scene_number: u32) -> bool {
        self.images_generated.contains(&scene_number)
    }

    pub fn is_audio_done(&self, scene_number: u32) -> bool {
        self.audio_generated.contains(&scene_number)
    }

    pub fn is_video_done(&self, platform: Platform, scene_number: u32) -> bool {
        self.videos_generated
            .get(&platform)
            .is_some_and(|scenes| scenes.contains(&scene_number))
    }
}
