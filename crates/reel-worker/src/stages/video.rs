//! Video assembly: per-scene segments, then one final video per platform.

use std::path::{Path, PathBuf};

use reel_models::{Platform, Scene, Stage};
use tracing::{info, warn};

use super::{artifact_exists, plan_units, shutdown_requested, JobContext};
use crate::error::{WorkerError, WorkerResult};
use crate::pool::{PoolOutcome, Slot};
use crate::services::SceneVideoRequest;

pub async fn run(ctx: &mut JobContext<'_>, music: Option<&Path>) -> WorkerResult<()> {
    let started = ctx.begin(Stage::Videos);
    let mut failed = 0;

    for &platform in ctx.platforms {
        ctx.check_cancelled()?;

        let final_path = ctx.layout.final_video_path(platform);
        if all_segments_done(ctx, platform) && artifact_exists(&final_path).await {
            info!(platform = %platform, path = %final_path.display(), "Reusing finished video");
            ctx.result.video_paths.insert(platform, final_path);
            continue;
        }

        let outcome = render_segments(ctx, platform).await;
        let (segments, failed_segments) = apply(ctx, platform, outcome);
        failed += failed_segments;
        ctx.check_cancelled()?;

        match assemble(ctx, platform, &segments, music).await {
            Ok(path) => {
                info!(
                    platform = %platform,
                    segments = segments.len(),
                    path = %path.display(),
                    "Video assembled"
                );
                ctx.result.video_paths.insert(platform, path);
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                failed += 1;
                ctx.record_error(format!("Video assembly ({}): {}", platform, e));
            }
        }
    }

    let total = (ctx.script.scenes.len() + 1) * ctx.platforms.len();
    ctx.finish_required(Stage::Videos, started, failed, total);
    Ok(())
}

fn all_segments_done(ctx: &JobContext<'_>, platform: Platform) -> bool {
    ctx.script
        .scenes
        .iter()
        .all(|s| ctx.checkpoint.is_video_done(platform, s.scene_number))
}

async fn render_segments(ctx: &JobContext<'_>, platform: Platform) -> PoolOutcome<PathBuf> {
    let layout = &ctx.layout;
    let checkpoint = &ctx.checkpoint;
    let items = plan_units(
        &ctx.script.scenes,
        |n| checkpoint.is_video_done(platform, n),
        |n| layout.segment_path(n, platform),
    )
    .await;

    let assembler = &ctx.collaborators.video;
    let shutdown = ctx.shutdown;

    ctx.pools
        .video
        .run_items(items, |_, scene: Scene| {
            let request = SceneVideoRequest {
                scene_number: scene.scene_number,
                image: layout.image_path(scene.scene_number, platform),
                audio: layout.audio_path(scene.scene_number),
                platform,
                duration: scene.duration_estimate,
            };
            let output = layout.segment_path(scene.scene_number, platform);
            async move {
                if shutdown_requested(shutdown) {
                    return Err(WorkerError::Cancelled);
                }
                for input in [&request.image, &request.audio] {
                    if !artifact_exists(input).await {
                        return Err(WorkerError::generation(format!(
                            "scene {} has no input {}",
                            request.scene_number,
                            input.display()
                        )));
                    }
                }
                assembler.create_scene_video(&request, &output).await?;
                Ok(output)
            }
        })
        .await
}

/// Returns the successful segments in scene order and the failure count.
fn apply(
    ctx: &mut JobContext<'_>,
    platform: Platform,
    outcome: PoolOutcome<PathBuf>,
) -> (Vec<PathBuf>, usize) {
    let mut segments = Vec::with_capacity(outcome.len());
    let mut failed = 0;

    for (scene, slot) in ctx.script.scenes.iter_mut().zip(outcome.slots) {
        match slot {
            Slot::Completed(path) => {
                ctx.checkpoint.mark_video_done(platform, scene.scene_number);
                scene.video_path = Some(path.clone());
                segments.push(path);
            }
            Slot::Reused(path) => {
                scene.video_path = Some(path.clone());
                segments.push(path);
            }
            Slot::Failed(e) if e.is_cancelled() => failed += 1,
            Slot::Failed(e) => {
                failed += 1;
                warn!(platform = %platform, scene_number = scene.scene_number, error = %e, "Scene segment failed");
                ctx.result.errors.push(format!(
                    "Video segment ({}, scene {}): {}",
                    platform, scene.scene_number, e
                ));
            }
        }
    }
    (segments, failed)
}

async fn assemble(
    ctx: &JobContext<'_>,
    platform: Platform,
    segments: &[PathBuf],
    music: Option<&Path>,
) -> WorkerResult<PathBuf> {
    if segments.is_empty() {
        return Err(WorkerError::stage(
            Stage::Videos,
            "no video segments were created successfully",
        ));
    }

    let assembler = &ctx.collaborators.video;
    let concat = ctx.layout.concat_path(platform);
    let output = ctx.layout.final_video_path(platform);
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    assembler.concatenate(segments, &concat).await?;
    ctx.check_cancelled()?;

    match music {
        Some(music) => assembler.add_background_music(&concat, music, &output).await?,
        None => {
            tokio::fs::copy(&concat, &output).await?;
        }
    }
    Ok(output)
}
