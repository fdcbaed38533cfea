//! `reel` command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};

use reel_models::{JobResult, Niche, Platform};
use reel_sources::{
    content_to_script, hackernews, openlibrary, reddit, wikipedia, ContentAggregator,
    HackerNewsSource, OpenLibrarySource, RedditSource, SourceSettings, WikipediaSource,
};
use reel_worker::{
    init_tracing, Collaborators, FfmpegVideoAssembler, OpenAiClient, Orchestrator,
    PipelineConfig, RunOptions, ScriptStore, SrtSubtitleWriter, WorkerError,
};

#[derive(Parser)]
#[command(name = "reel", version, about = "Generate short-form videos from scripts and web content")]
struct Cli {
    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Produce videos for a niche
    Generate {
        niche: Niche,
        /// Number of scripts to process
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=10))]
        count: u8,
        /// Target platform; repeat for several (default: youtube and tiktok)
        #[arg(short, long = "platform")]
        platforms: Vec<Platform>,
        /// Process this script file only
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Never fetch new content, only use saved scripts
        #[arg(long)]
        skip_fetch: bool,
        /// Rewrite scripts with the chat model first
        #[arg(short, long)]
        enhance: bool,
        #[arg(long)]
        no_thumbnails: bool,
        #[arg(long)]
        no_subtitles: bool,
        /// Background music mixed under every video
        #[arg(short, long)]
        music: Option<PathBuf>,
    },
    /// Fetch and rank content without generating anything
    Fetch {
        niche: Niche,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        query: Option<String>,
        /// Save results as scripts
        #[arg(long)]
        save: bool,
    },
    /// Check configuration and external tools
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = PipelineConfig::from_env();

    match cli.command {
        Command::Validate => validate(&config),
        Command::Fetch {
            niche,
            limit,
            query,
            save,
        } => fetch(&config, niche, limit, query.as_deref(), save).await,
        Command::Generate {
            niche,
            count,
            platforms,
            script,
            skip_fetch,
            enhance,
            no_thumbnails,
            no_subtitles,
            music,
        } => {
            let options = RunOptions {
                script_path: script,
                fetch_missing: !skip_fetch,
                enhance,
                thumbnails: !no_thumbnails,
                subtitles: !no_subtitles,
                music,
            };
            let platforms = if platforms.is_empty() {
                vec![Platform::Youtube, Platform::Tiktok]
            } else {
                platforms
            };
            generate(config, niche, &platforms, usize::from(count), options).await
        }
    }
}

fn validate(config: &PipelineConfig) -> anyhow::Result<()> {
    match config.validate() {
        Ok(()) => {
            println!("Configuration OK");
            println!("  output dir:      {}", config.output_dir.display());
            println!("  checkpointing:   {}", config.enable_checkpointing);
            println!(
                "  workers:         images={} tts={} video={}",
                config.max_concurrent_images, config.max_concurrent_tts, config.max_concurrent_videos
            );
            Ok(())
        }
        Err(WorkerError::Config(issues)) => {
            println!("Configuration has problems:");
            for issue in issues.split("; ") {
                println!("  - {}", issue);
            }
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn build_aggregator(config: &PipelineConfig) -> anyhow::Result<ContentAggregator> {
    let sources = &config.sources;
    let settings = |base_url: &str, rpm: u32| {
        SourceSettings::new(base_url, rpm)
            .with_user_agent(sources.user_agent.as_str())
            .with_timeout(config.request_timeout)
    };

    Ok(ContentAggregator::new(sources.aggregator_config())
        .with_source(Arc::new(RedditSource::new(settings(
            reddit::DEFAULT_BASE_URL,
            sources.reddit_rate_limit,
        ))?))
        .with_source(Arc::new(HackerNewsSource::new(settings(
            hackernews::DEFAULT_BASE_URL,
            sources.hackernews_rate_limit,
        ))?))
        .with_source(Arc::new(WikipediaSource::new(settings(
            wikipedia::DEFAULT_BASE_URL,
            sources.wikipedia_rate_limit,
        ))?))
        .with_source(Arc::new(OpenLibrarySource::new(settings(
            openlibrary::DEFAULT_BASE_URL,
            sources.openlibrary_rate_limit,
        ))?)))
}

async fn fetch(
    config: &PipelineConfig,
    niche: Niche,
    limit: usize,
    query: Option<&str>,
    save: bool,
) -> anyhow::Result<()> {
    let aggregator = build_aggregator(config)?;
    let items = aggregator
        .fetch(niche, query, limit, None)
        .await
        .context("content fetch failed")?;

    println!("{:<4} {:<12} {:>8} {:>6}  TITLE", "#", "SOURCE", "SCORE", "WORDS");
    for (i, item) in items.iter().enumerate() {
        println!(
            "{:<4} {:<12} {:>8.1} {:>6}  {}",
            i + 1,
            item.source_type.as_str(),
            item.score,
            item.word_count(),
            item.title
        );
    }

    if save {
        let store = ScriptStore::new();
        let dir = config.scripts_dir(niche);
        let mut saved = 0;
        for item in items.iter().filter(|i| i.has_sufficient_content(config.min_content_words)) {
            match content_to_script(item, niche, config.words_per_scene, config.max_scenes) {
                Ok(script) => {
                    let path = store.save(&script, &dir).await?;
                    info!(path = %path.display(), "Saved script");
                    saved += 1;
                }
                Err(e) => warn!(title = %item.title, error = %e, "Skipping content"),
            }
        }
        println!("Saved {} script(s) to {}", saved, dir.display());
    }
    Ok(())
}

async fn generate(
    config: PipelineConfig,
    niche: Niche,
    platforms: &[Platform],
    count: usize,
    options: RunOptions,
) -> anyhow::Result<()> {
    config.validate()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal; stopping after the current step");
            let _ = shutdown_tx.send(true);
        }
    });

    let openai = Arc::new(OpenAiClient::new(&config.openai, config.request_timeout)?);
    let assembler = Arc::new(FfmpegVideoAssembler::new(&config).with_cancel(shutdown_rx.clone()));
    let collaborators = Collaborators::new(openai.clone(), openai.clone(), assembler.clone())
        .with_enhancer(openai)
        .with_thumbnails(assembler)
        .with_subtitles(Arc::new(SrtSubtitleWriter::default()));

    let mut orchestrator = Orchestrator::new(config, collaborators).with_shutdown(shutdown_rx);
    if options.fetch_missing && options.script_path.is_none() {
        let aggregator = build_aggregator(orchestrator.config())?;
        orchestrator = orchestrator.with_aggregator(Arc::new(aggregator));
    }

    info!(niche = %niche, count, platforms = ?platforms, "Starting generation");
    let results = orchestrator.run(niche, platforms, count, &options).await?;
    print_summary(&results);

    if results.iter().any(|r| !r.success) {
        error!(failed = results.iter().filter(|r| !r.success).count(), "Some jobs did not succeed");
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(results: &[JobResult]) {
    for result in results {
        let name = result
            .script_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "{} [{}] {:.1}s",
            name,
            result.status,
            result.duration_seconds
        );
        for (platform, path) in &result.video_paths {
            println!("  {:<8} {}", platform, path.display());
        }
        for warning in &result.warnings {
            println!("  warning: {}", warning);
        }
        for err in &result.errors {
            println!("  error: {}", err);
        }
    }
}
