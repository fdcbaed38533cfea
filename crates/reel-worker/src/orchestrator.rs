//! Top-level job sequencing.
//!
//! One [`Orchestrator::run`] call collects scripts (given file, existing
//! scripts, then freshly scraped content), and processes them one after
//! another. Each script runs its stages in strict order with a checkpoint
//! save after every stage; a failure of one script never affects the next.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use reel_models::{JobResult, JobStatus, Niche, Platform, Script};
use reel_sources::{content_to_script, ContentAggregator};
use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

use crate::checkpoint_store::CheckpointStore;
use crate::config::PipelineConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::pool::panic_message;
use crate::scripts::ScriptStore;
use crate::services::Collaborators;
use crate::stages::{self, audio, images, optional, video, JobContext, StagePools};

/// Per-invocation switches.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Process exactly this script file instead of the niche's scripts.
    pub script_path: Option<PathBuf>,
    /// Scrape new content when fewer scripts exist than requested.
    pub fetch_missing: bool,
    pub enhance: bool,
    pub thumbnails: bool,
    pub subtitles: bool,
    /// Background track mixed under every final video.
    pub music: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            script_path: None,
            fetch_missing: true,
            enhance: false,
            thumbnails: true,
            subtitles: true,
            music: None,
        }
    }
}

pub struct Orchestrator {
    config: PipelineConfig,
    collaborators: Collaborators,
    aggregator: Option<Arc<ContentAggregator>>,
    checkpoints: CheckpointStore,
    scripts: ScriptStore,
    pools: StagePools,
    shutdown: watch::Receiver<bool>,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        let checkpoints = CheckpointStore::new(config.enable_checkpointing);
        let pools = StagePools::from_config(&config);
        // A sender that is dropped at once: the receiver simply never fires.
        let (_, shutdown) = watch::channel(false);
        Self {
            config,
            collaborators,
            aggregator: None,
            checkpoints,
            scripts: ScriptStore::new(),
            pools,
            shutdown,
        }
    }

    pub fn with_aggregator(mut self, aggregator: Arc<ContentAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Stop between stages (and before new pool work) once this flips to `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Produce videos for up to `count` scripts of `niche`.
    ///
    /// Input is checked before any work starts. The returned results are in
    /// processing order; scripts not started because of a shutdown are
    /// absent.
    pub async fn run(
        &self,
        niche: Niche,
        platforms: &[Platform],
        count: usize,
        options: &RunOptions,
    ) -> WorkerResult<Vec<JobResult>> {
        if platforms.is_empty() {
            return Err(WorkerError::invalid_input("at least one platform is required"));
        }
        if count == 0 {
            return Err(WorkerError::invalid_input("count must be at least 1"));
        }
        let mut targets: Vec<Platform> = Vec::with_capacity(platforms.len());
        for platform in platforms {
            if !targets.contains(platform) {
                targets.push(*platform);
            }
        }

        let scripts = self.collect_scripts(niche, count, options).await?;
        if scripts.is_empty() {
            warn!(niche = %niche, "No scripts to process");
            return Ok(Vec::new());
        }
        info!(
            niche = %niche,
            scripts = scripts.len(),
            platforms = ?targets,
            "Starting pipeline run"
        );

        let total = scripts.len();
        let mut results = Vec::with_capacity(total);
        for (script_path, script) in scripts {
            if stages::shutdown_requested(&self.shutdown) {
                warn!(remaining = total - results.len(), "Shutdown requested; not starting further scripts");
                break;
            }
            let result = self.process_script(script_path, script, &targets, options).await;
            let cancelled = result.status == JobStatus::Cancelled;
            results.push(result);
            if cancelled {
                break;
            }
        }
        Ok(results)
    }

    async fn collect_scripts(
        &self,
        niche: Niche,
        count: usize,
        options: &RunOptions,
    ) -> WorkerResult<Vec<(PathBuf, Script)>> {
        if let Some(path) = &options.script_path {
            let script = self.scripts.load(path).await?;
            if script.niche != niche {
                debug!(script_niche = %script.niche, requested = %niche, "Script niche differs from requested niche");
            }
            return Ok(vec![(path.clone(), script)]);
        }

        let scripts_dir = self.config.scripts_dir(niche);
        let mut scripts = self.scripts.load_existing(&scripts_dir, count).await?;
        info!(niche = %niche, existing = scripts.len(), requested = count, "Loaded existing scripts");

        if scripts.len() < count && options.fetch_missing {
            match &self.aggregator {
                Some(aggregator) => {
                    self.scrape(aggregator, niche, count, &scripts_dir, &mut scripts)
                        .await
                }
                None => debug!("No content aggregator configured; skipping fetch"),
            }
        }
        Ok(scripts)
    }

    /// Fill `scripts` up to `count` from fresh content. Fetch problems are
    /// logged; the run continues with what it has.
    async fn scrape(
        &self,
        aggregator: &ContentAggregator,
        niche: Niche,
        count: usize,
        scripts_dir: &Path,
        scripts: &mut Vec<(PathBuf, Script)>,
    ) {
        let needed = count - scripts.len();
        info!(niche = %niche, needed, status = %JobStatus::Scraping, "Fetching content for new scripts");

        let items = match aggregator.fetch(niche, None, needed, None).await {
            Ok(items) => items,
            Err(e) => {
                warn!(niche = %niche, error = %e, "Content fetch failed");
                return;
            }
        };

        for item in items {
            if scripts.len() >= count {
                break;
            }
            if !item.has_sufficient_content(self.config.min_content_words) {
                debug!(title = %item.title, words = item.word_count(), "Skipping thin content");
                continue;
            }
            let script = match content_to_script(
                &item,
                niche,
                self.config.words_per_scene,
                self.config.max_scenes,
            ) {
                Ok(script) => script,
                Err(e) => {
                    warn!(title = %item.title, error = %e, "Content could not be turned into a script");
                    continue;
                }
            };
            let safe_title = script.safe_title();
            if scripts.iter().any(|(_, s)| s.safe_title() == safe_title) {
                debug!(title = %script.title, "Script already present");
                continue;
            }
            match self.scripts.save(&script, scripts_dir).await {
                Ok(path) => {
                    info!(path = %path.display(), scenes = script.scenes.len(), "Saved new script");
                    scripts.push((path, script));
                }
                Err(e) => warn!(title = %script.title, error = %e, "Could not save script"),
            }
        }
    }

    /// Run every stage for one script. Never returns an error: whatever
    /// happens ends up in the result's status and error list.
    pub async fn process_script(
        &self,
        script_path: PathBuf,
        script: Script,
        platforms: &[Platform],
        options: &RunOptions,
    ) -> JobResult {
        let started = Instant::now();
        let layout = self.config.layout(&script);
        let checkpoint_path = layout.checkpoint_path();
        let checkpoint = self
            .checkpoints
            .load_or_create(&checkpoint_path, &script_path)
            .await;

        let logger = JobLogger::new(&checkpoint.job_id, "generate");
        let span = logger.script_span(&script);

        let mut ctx = JobContext {
            collaborators: &self.collaborators,
            pools: &self.pools,
            shutdown: &self.shutdown,
            platforms,
            layout,
            script,
            checkpoint,
            result: JobResult::default(),
        };

        let outcome = AssertUnwindSafe(
            async {
                logger.log_start(&format!(
                    "\"{}\" ({} scenes)",
                    ctx.script.title,
                    ctx.script.scenes.len()
                ));
                self.run_stages(&mut ctx, options, &checkpoint_path).await
            }
            .instrument(span.clone()),
        )
        .catch_unwind()
        .await;

        let status = match outcome {
            Ok(Ok(())) => JobStatus::Completed,
            Ok(Err(e)) if e.is_cancelled() => {
                logger.log_warning("cancelled; progress saved for resume");
                JobStatus::Cancelled
            }
            Ok(Err(e)) => {
                logger.log_error(&e.to_string());
                ctx.result.errors.push(e.to_string());
                JobStatus::Failed
            }
            Err(panic) => {
                let message = format!("unexpected panic: {}", panic_message(&*panic));
                logger.log_error(&message);
                ctx.result.errors.push(message);
                JobStatus::Failed
            }
        };

        ctx.checkpoint.set_status(status);
        self.save_checkpoint(&ctx, &checkpoint_path).await;

        let mut result = ctx.result;
        result.status = status;
        result.success = status == JobStatus::Completed && result.errors.is_empty();
        result.script_path = Some(script_path);
        result.duration_seconds = started.elapsed().as_secs_f64();

        metrics::counter!("reel_jobs_total", "status" => status.as_str()).increment(1);
        if result.success {
            logger.log_completion(&format!(
                "{} video(s) in {:.1}s",
                result.video_paths.len(),
                result.duration_seconds
            ));
        } else if status == JobStatus::Completed {
            logger.log_warning(&format!(
                "finished with {} error(s); {} video(s) produced",
                result.errors.len(),
                result.video_paths.len()
            ));
        }
        result
    }

    async fn run_stages(
        &self,
        ctx: &mut JobContext<'_>,
        options: &RunOptions,
        checkpoint_path: &Path,
    ) -> WorkerResult<()> {
        ctx.layout.ensure_dirs().await?;

        optional::enhance(ctx, &self.scripts, options.enhance).await?;
        self.save_checkpoint(ctx, checkpoint_path).await;

        images::run(ctx).await?;
        self.save_checkpoint(ctx, checkpoint_path).await;

        audio::run(ctx).await?;
        self.save_checkpoint(ctx, checkpoint_path).await;

        video::run(ctx, options.music.as_deref()).await?;
        self.save_checkpoint(ctx, checkpoint_path).await;

        optional::thumbnails(ctx, options.thumbnails).await?;
        self.save_checkpoint(ctx, checkpoint_path).await;

        optional::subtitles(ctx, options.subtitles).await?;
        Ok(())
    }

    /// A failed save costs resumability, not the job.
    async fn save_checkpoint(&self, ctx: &JobContext<'_>, path: &Path) {
        if let Err(e) = self.checkpoints.save(&ctx.checkpoint, path).await {
            warn!(path = %path.display(), error = %e, "Failed to save checkpoint");
        }
    }
}
