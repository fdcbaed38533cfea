//! Image generation: one image per scene and platform.

use std::path::PathBuf;

use reel_models::{Platform, Scene, Stage};
use tracing::{info, warn};

use super::{plan_units, shutdown_requested, JobContext};
use crate::error::WorkerError;
use crate::pool::{PoolOutcome, Slot};

pub async fn run(ctx: &mut JobContext<'_>) -> Result<(), WorkerError> {
    let started = ctx.begin(Stage::Images);
    let resumed = ctx.checkpoint.is_stage_complete(Stage::Images);
    let mut failed = 0;
    let mut executed = 0;

    for &platform in ctx.platforms {
        ctx.check_cancelled()?;
        let outcome = generate_for_platform(ctx, platform).await;
        executed += outcome.executed_count();
        failed += apply(ctx, platform, outcome);
    }
    ctx.check_cancelled()?;

    if resumed && executed > 0 {
        warn!(regenerated = executed, "Images were marked complete but some were missing on disk");
    }
    let total = ctx.script.scenes.len() * ctx.platforms.len();
    ctx.finish_required(Stage::Images, started, failed, total);
    Ok(())
}

async fn generate_for_platform(ctx: &JobContext<'_>, platform: Platform) -> PoolOutcome<PathBuf> {
    let layout = &ctx.layout;
    let checkpoint = &ctx.checkpoint;
    let items = plan_units(
        &ctx.script.scenes,
        |n| checkpoint.is_image_done(n),
        |n| layout.image_path(n, platform),
    )
    .await;

    let generator = &ctx.collaborators.images;
    let shutdown = ctx.shutdown;
    let niche = ctx.script.niche;
    let style = ctx.script.style_suffix();
    let style = style.as_str();

    ctx.pools
        .images
        .run_items(items, |_, scene: Scene| {
            let output = layout.image_path(scene.scene_number, platform);
            async move {
                if shutdown_requested(shutdown) {
                    return Err(WorkerError::Cancelled);
                }
                generator
                    .generate_for_scene(&scene, niche, platform, style, &output)
                    .await
            }
        })
        .await
}

/// Fold one platform's outcome into the job. Returns the failed unit count.
fn apply(ctx: &mut JobContext<'_>, platform: Platform, outcome: PoolOutcome<PathBuf>) -> usize {
    let generated = outcome.executed_count();
    let reused = outcome.reused_count();
    let succeeded = outcome.success_count();
    let mut failed = 0;

    for (scene, slot) in ctx.script.scenes.iter_mut().zip(outcome.slots) {
        match slot {
            Slot::Completed(path) => {
                ctx.checkpoint.mark_image_done(scene.scene_number);
                scene.image_path = Some(path);
            }
            Slot::Reused(path) => scene.image_path = Some(path),
            Slot::Failed(e) => {
                failed += 1;
                if !e.is_cancelled() {
                    warn!(platform = %platform, scene_number = scene.scene_number, error = %e, "Image generation failed");
                    ctx.result.errors.push(format!(
                        "Image generation ({}, scene {}): {}",
                        platform, scene.scene_number, e
                    ));
                }
            }
        }
    }

    if succeeded == 0 && !ctx.script.scenes.is_empty() && !ctx.is_cancelled() {
        ctx.record_error(format!("Image generation ({}): no images were generated", platform));
    }

    info!(platform = %platform, generated, reused, failed, "Image generation finished for platform");
    failed
}
