//! Best-effort stages. None of them can fail a job: every attempt ends in
//! an explicit [`StageOutcome`] and failures surface as warnings.

use reel_models::{Stage, StageOutcome};
use tracing::{debug, info};

use super::JobContext;
use crate::error::WorkerResult;
use crate::scripts::ScriptStore;

/// Rewrite the script with the enhancer before any generation.
pub async fn enhance(ctx: &mut JobContext<'_>, store: &ScriptStore, requested: bool) -> WorkerResult<()> {
    ctx.check_cancelled()?;
    let started = ctx.begin(Stage::Enhance);
    if !requested {
        ctx.finish_optional(Stage::Enhance, started, StageOutcome::skipped("not requested"));
        return Ok(());
    }
    let scripts_dir = ctx.layout.scripts_dir();

    // Only a successful earlier enhancement is reused; skips and failures
    // are attempted again.
    if ctx.checkpoint.outcome(Stage::Enhance).is_some_and(StageOutcome::is_completed) {
        if let Some(enhanced) = store.load_enhanced(&scripts_dir, &ctx.script).await {
            debug!("Using enhanced script from a previous run");
            ctx.script = enhanced;
            ctx.finish_optional(Stage::Enhance, started, StageOutcome::Completed);
            return Ok(());
        }
        debug!("Enhanced script from a previous run is missing; enhancing again");
    }

    let Some(enhancer) = ctx.collaborators.enhancer.clone() else {
        ctx.finish_optional(Stage::Enhance, started, StageOutcome::skipped("no enhancer configured"));
        return Ok(());
    };

    let outcome = match enhancer.enhance(&ctx.script).await {
        Ok(mut enhanced) => {
            // The safe title keys every artifact and the checkpoint file.
            enhanced.title = ctx.script.title.clone();
            match store.save_enhanced(&enhanced, &scripts_dir).await {
                Ok(path) => {
                    info!(path = %path.display(), scenes = enhanced.scenes.len(), "Script enhanced");
                    ctx.script = enhanced;
                    StageOutcome::Completed
                }
                Err(e) => StageOutcome::failed(format!("could not save enhanced script: {}", e)),
            }
        }
        Err(e) if e.is_cancelled() => return Err(e),
        Err(e) => StageOutcome::failed(e.to_string()),
    };

    ctx.finish_optional(Stage::Enhance, started, outcome);
    Ok(())
}

pub async fn thumbnails(ctx: &mut JobContext<'_>, requested: bool) -> WorkerResult<()> {
    ctx.check_cancelled()?;
    let started = ctx.begin(Stage::Thumbnails);
    let generator = match (gate(ctx, requested), ctx.collaborators.thumbnails.clone()) {
        (Some(reason), _) => {
            ctx.finish_optional(Stage::Thumbnails, started, StageOutcome::skipped(reason));
            return Ok(());
        }
        (None, None) => {
            ctx.finish_optional(Stage::Thumbnails, started, StageOutcome::skipped("no thumbnail generator configured"));
            return Ok(());
        }
        (None, Some(generator)) => generator,
    };

    let output_dir = ctx.layout.thumbnails_dir();
    let videos: Vec<_> = ctx
        .result
        .video_paths
        .iter()
        .map(|(platform, path)| (*platform, path.clone()))
        .collect();

    let mut failures = Vec::new();
    for (platform, video) in videos {
        ctx.check_cancelled()?;
        match generator.generate(&ctx.script, &video, platform, &output_dir).await {
            Ok(paths) => {
                debug!(platform = %platform, count = paths.len(), "Thumbnails generated");
                ctx.result.thumbnail_paths.extend(paths);
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => failures.push(format!("{}: {}", platform, e)),
        }
    }

    ctx.finish_optional(Stage::Thumbnails, started, outcome_from(failures));
    Ok(())
}

pub async fn subtitles(ctx: &mut JobContext<'_>, requested: bool) -> WorkerResult<()> {
    ctx.check_cancelled()?;
    let started = ctx.begin(Stage::Subtitles);
    let generator = match (gate(ctx, requested), ctx.collaborators.subtitles.clone()) {
        (Some(reason), _) => {
            ctx.finish_optional(Stage::Subtitles, started, StageOutcome::skipped(reason));
            return Ok(());
        }
        (None, None) => {
            ctx.finish_optional(Stage::Subtitles, started, StageOutcome::skipped("no subtitle generator configured"));
            return Ok(());
        }
        (None, Some(generator)) => generator,
    };

    let output_dir = ctx.layout.subtitles_dir();
    let platforms: Vec<_> = ctx.result.video_paths.keys().copied().collect();

    let mut failures = Vec::new();
    for platform in platforms {
        ctx.check_cancelled()?;
        match generator.generate(&ctx.script, platform, &output_dir).await {
            Ok(path) => {
                ctx.result.subtitle_paths.insert(platform, path);
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => failures.push(format!("{}: {}", platform, e)),
        }
    }

    ctx.finish_optional(Stage::Subtitles, started, outcome_from(failures));
    Ok(())
}

/// Reason to skip, or `None` when the stage should run. Only a job with at
/// least one final video gets thumbnails or subtitles; earlier unit errors
/// do not block them.
fn gate(ctx: &JobContext<'_>, requested: bool) -> Option<&'static str> {
    if !requested {
        Some("not requested")
    } else if ctx.result.video_paths.is_empty() {
        Some("no final video was produced")
    } else {
        None
    }
}

fn outcome_from(failures: Vec<String>) -> StageOutcome {
    if failures.is_empty() {
        StageOutcome::Completed
    } else {
        StageOutcome::failed(failures.join("; "))
    }
}
