//! Narration audio, one file per scene, followed by duration correction.

use std::path::PathBuf;

use reel_models::script::MIN_SCENE_DURATION;
use reel_models::{Scene, Stage};
use tracing::{debug, info, warn};

use super::{artifact_exists, plan_units, shutdown_requested, JobContext};
use crate::error::{WorkerError, WorkerResult};
use crate::pool::{PoolOutcome, Slot};

pub async fn run(ctx: &mut JobContext<'_>) -> WorkerResult<()> {
    let started = ctx.begin(Stage::Audio);
    let resumed = ctx.checkpoint.is_stage_complete(Stage::Audio);

    let outcome = generate(ctx).await;

    if resumed && outcome.executed_count() > 0 {
        warn!(
            regenerated = outcome.executed_count(),
            "Audio was marked complete but some files were missing on disk"
        );
    }
    let failed = apply(ctx, outcome);
    ctx.check_cancelled()?;

    correct_durations(ctx).await;

    let total = ctx.script.scenes.len();
    ctx.finish_required(Stage::Audio, started, failed, total);
    Ok(())
}

async fn generate(ctx: &JobContext<'_>) -> PoolOutcome<PathBuf> {
    let layout = &ctx.layout;
    let checkpoint = &ctx.checkpoint;
    let items = plan_units(
        &ctx.script.scenes,
        |n| checkpoint.is_audio_done(n),
        |n| layout.audio_path(n),
    )
    .await;

    let speech = &ctx.collaborators.speech;
    let shutdown = ctx.shutdown;
    let niche = ctx.script.niche;

    ctx.pools
        .speech
        .run_items(items, |_, scene: Scene| {
            let output = layout.audio_path(scene.scene_number);
            async move {
                if shutdown_requested(shutdown) {
                    return Err(WorkerError::Cancelled);
                }
                speech.generate_for_scene(&scene, niche, &output).await
            }
        })
        .await
}

fn apply(ctx: &mut JobContext<'_>, outcome: PoolOutcome<PathBuf>) -> usize {
    let generated = outcome.executed_count();
    let reused = outcome.reused_count();
    let succeeded = outcome.success_count();
    let mut failed = 0;

    for (scene, slot) in ctx.script.scenes.iter_mut().zip(outcome.slots) {
        match slot {
            Slot::Completed(path) => {
                ctx.checkpoint.mark_audio_done(scene.scene_number);
                scene.audio_path = Some(path);
            }
            Slot::Reused(path) => scene.audio_path = Some(path),
            Slot::Failed(e) => {
                failed += 1;
                if !e.is_cancelled() {
                    warn!(scene_number = scene.scene_number, error = %e, "Audio generation failed");
                    ctx.result
                        .errors
                        .push(format!("Audio generation (scene {}): {}", scene.scene_number, e));
                }
            }
        }
    }

    if succeeded == 0 && !ctx.script.scenes.is_empty() && !ctx.is_cancelled() {
        ctx.record_error("Audio generation: no narration was generated".to_string());
    }

    info!(generated, reused, failed, "Audio generation finished");
    failed
}

/// Replace word-count estimates with measured audio lengths; later video
/// timing depends on them. Scenes without audio keep their estimate.
pub async fn correct_durations(ctx: &mut JobContext<'_>) {
    let layout = &ctx.layout;
    let mut measurable = Vec::new();
    for (index, scene) in ctx.script.scenes.iter().enumerate() {
        let path = layout.audio_path(scene.scene_number);
        if artifact_exists(&path).await {
            measurable.push((index, path));
        }
    }

    let speech = &ctx.collaborators.speech;
    let measured = ctx
        .pools
        .speech
        .run(measurable, |_, (index, path): (usize, PathBuf)| async move {
            let seconds = speech.measure_duration(&path).await?;
            Ok((index, seconds))
        })
        .await;

    let mut corrected = 0;
    for slot in measured.slots {
        match slot {
            Slot::Completed((index, seconds)) | Slot::Reused((index, seconds)) => {
                let scene = &mut ctx.script.scenes[index];
                scene.duration_estimate = seconds.max(MIN_SCENE_DURATION);
                corrected += 1;
            }
            Slot::Failed(e) => {
                ctx.record_warning(format!("Audio duration could not be measured: {}", e));
            }
        }
    }
    debug!(corrected, total_secs = ctx.script.total_duration(), "Scene durations corrected");
}
