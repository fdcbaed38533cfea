//! Stage runners for one script.
//!
//! Each runner fans scene-level units out over a [`WorkerPool`], reuses
//! artifacts a previous run already produced, and folds the per-unit
//! outcome back into the job's checkpoint and result. Workers never touch
//! the checkpoint; only the runner does, after the pool has drained.

pub mod audio;
pub mod images;
pub mod optional;
pub mod video;

use std::path::{Path, PathBuf};
use std::time::Instant;

use reel_models::{Checkpoint, JobResult, Platform, Scene, Script, Stage, StageOutcome};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::layout::ArtifactLayout;
use crate::pool::{WorkItem, WorkerPool};
use crate::services::Collaborators;

/// One pool per kind of external work.
#[derive(Debug, Clone)]
pub struct StagePools {
    pub images: WorkerPool,
    pub speech: WorkerPool,
    pub video: WorkerPool,
}

impl StagePools {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            images: WorkerPool::new("images", config.max_concurrent_images),
            speech: WorkerPool::new("speech", config.max_concurrent_tts),
            video: WorkerPool::new("video", config.max_concurrent_videos),
        }
    }
}

/// Mutable state of one script while its stages run.
pub struct JobContext<'a> {
    pub collaborators: &'a Collaborators,
    pub pools: &'a StagePools,
    pub shutdown: &'a watch::Receiver<bool>,
    pub platforms: &'a [Platform],
    pub layout: ArtifactLayout,
    pub script: Script,
    pub checkpoint: Checkpoint,
    pub result: JobResult,
}

impl JobContext<'_> {
    pub fn is_cancelled(&self) -> bool {
        shutdown_requested(self.shutdown)
    }

    pub fn check_cancelled(&self) -> WorkerResult<()> {
        if self.is_cancelled() {
            Err(WorkerError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn begin(&mut self, stage: Stage) -> Instant {
        self.checkpoint.set_status(stage.status());
        info!(stage = %stage, status = %self.checkpoint.status, "Stage started");
        Instant::now()
    }

    pub fn record_error(&mut self, message: String) {
        warn!(error = %message, "Recorded job error");
        self.result.errors.push(message);
    }

    pub fn record_warning(&mut self, message: String) {
        warn!(warning = %message, "Recorded job warning");
        self.result.warnings.push(message);
    }

    /// Close a scene-level stage. It only counts as complete when no unit
    /// failed; otherwise the next run re-enters it and the per-unit flags
    /// skip whatever already succeeded.
    pub fn finish_required(&mut self, stage: Stage, started: Instant, failed: usize, total: usize) {
        if failed == 0 {
            self.checkpoint.mark_stage_complete(stage);
            self.checkpoint.record_outcome(stage, StageOutcome::Completed);
        } else {
            self.checkpoint.record_outcome(
                stage,
                StageOutcome::failed(format!("{} of {} units failed", failed, total)),
            );
        }
        stage_finished(stage, started, failed == 0);
    }

    /// Close an optional stage. Attempted stages are marked complete
    /// whatever their outcome; failures become warnings, never errors.
    pub fn finish_optional(&mut self, stage: Stage, started: Instant, outcome: StageOutcome) {
        match &outcome {
            StageOutcome::Completed => self.checkpoint.mark_stage_complete(stage),
            StageOutcome::Failed { reason } => {
                self.checkpoint.mark_stage_complete(stage);
                self.record_warning(format!("{}: {}", stage, reason));
            }
            StageOutcome::Skipped { reason } => {
                info!(stage = %stage, reason = %reason, "Stage skipped");
            }
        }
        let completed = outcome.is_completed();
        self.checkpoint.record_outcome(stage, outcome);
        stage_finished(stage, started, completed);
    }
}

fn stage_finished(stage: Stage, started: Instant, completed: bool) {
    let elapsed = started.elapsed().as_secs_f64();
    metrics::histogram!("reel_stage_duration_seconds", "stage" => stage.as_str())
        .record(elapsed);
    info!(
        stage = %stage,
        completed,
        elapsed_secs = %format!("{:.2}", elapsed),
        "Stage finished"
    );
}

pub fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Filesystem truth for resume: a non-empty file at `path`.
pub async fn artifact_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Turn scenes into pool items. A scene is reused only when its checkpoint
/// flag is set and the artifact is still on disk.
pub async fn plan_units<D, P>(scenes: &[Scene], is_done: D, path_for: P) -> Vec<WorkItem<Scene, PathBuf>>
where
    D: Fn(u32) -> bool,
    P: Fn(u32) -> PathBuf,
{
    let mut items = Vec::with_capacity(scenes.len());
    for scene in scenes {
        let path = path_for(scene.scene_number);
        if is_done(scene.scene_number) && artifact_exists(&path).await {
            items.push(WorkItem::Done(path));
        } else {
            items.push(WorkItem::Todo(scene.clone()));
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::Niche;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_plan_trusts_flags_only_with_files() {
        let dir = TempDir::new().unwrap();
        let script = Script::new(
            "Plan",
            Niche::History,
            vec![
                Scene::new(1, "one", "p"),
                Scene::new(2, "two", "p"),
                Scene::new(3, "three", "p"),
            ],
        );
        let path_for = |n: u32| dir.path().join(format!("scene_{:02}.png", n));
        std::fs::write(path_for(1), b"img").unwrap();
        std::fs::write(path_for(3), b"img").unwrap();

        // Scene 2 is flagged but its file is gone; scene 3 has a file but no flag.
        let items = plan_units(&script.scenes, |n| n <= 2, path_for).await;

        assert!(matches!(items[0], WorkItem::Done(_)));
        assert!(matches!(items[1], WorkItem::Todo(_)));
        assert!(matches!(items[2], WorkItem::Todo(_)));
    }

    #[tokio::test]
    async fn test_empty_files_are_not_artifacts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.mp3");
        std::fs::write(&path, b"").unwrap();
        assert!(!artifact_exists(&path).await);
        assert!(!artifact_exists(&dir.path().join("missing.mp3")).await);
    }
}
