//! Pipeline configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use reel_models::{Niche, Script};
use reel_sources::{AggregatorConfig, DEFAULT_MAX_SCENES, DEFAULT_WORDS_PER_SCENE};

use crate::error::{WorkerError, WorkerResult};
use crate::layout::ArtifactLayout;

pub const TTS_VOICES: [&str; 6] = ["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parallelism for subprocess-heavy work.
pub fn default_media_workers() -> usize {
    num_cpus::get().clamp(1, 4)
}

/// OpenAI-compatible API settings.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub image_model: String,
    pub image_quality: String,
    pub tts_model: String,
    pub chat_model: String,
    pub tts_voice: String,
    pub tts_speed: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            image_model: "gpt-image-1".to_string(),
            image_quality: "medium".to_string(),
            tts_model: "tts-1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            tts_voice: "onyx".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// Content source settings.
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub reddit_rate_limit: u32,
    pub hackernews_rate_limit: u32,
    pub wikipedia_rate_limit: u32,
    pub openlibrary_rate_limit: u32,
    pub parallel_fetch: bool,
    pub user_agent: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            reddit_rate_limit: 30,
            hackernews_rate_limit: 60,
            wikipedia_rate_limit: 100,
            openlibrary_rate_limit: 100,
            parallel_fetch: true,
            user_agent: reel_sources::http::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourcesConfig {
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            parallel: self.parallel_fetch,
            ..AggregatorConfig::default()
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of all generated artifacts, one subdirectory per niche
    pub output_dir: PathBuf,
    /// Persist per-script checkpoints so interrupted runs can resume
    pub enable_checkpointing: bool,
    pub max_concurrent_images: usize,
    pub max_concurrent_tts: usize,
    pub max_concurrent_videos: usize,
    /// Timeout for one external API call
    pub request_timeout: Duration,
    /// Timeout for one FFmpeg invocation
    pub ffmpeg_timeout: Duration,
    pub ken_burns: bool,
    pub music_volume: f32,
    pub words_per_scene: usize,
    pub max_scenes: usize,
    pub min_content_words: usize,
    pub openai: OpenAiConfig,
    pub sources: SourcesConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            enable_checkpointing: true,
            max_concurrent_images: 5,
            max_concurrent_tts: 5,
            max_concurrent_videos: default_media_workers(),
            request_timeout: Duration::from_secs(120),
            ffmpeg_timeout: Duration::from_secs(600),
            ken_burns: true,
            music_volume: reel_media::DEFAULT_MUSIC_VOLUME,
            words_per_scene: DEFAULT_WORDS_PER_SCENE,
            max_scenes: DEFAULT_MAX_SCENES,
            min_content_words: reel_models::MIN_CONTENT_WORDS,
            openai: OpenAiConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let openai_defaults = OpenAiConfig::default();
        let source_defaults = SourcesConfig::default();

        Self {
            output_dir: PathBuf::from(env_string("REEL_OUTPUT_DIR", "output")),
            enable_checkpointing: env_bool("REEL_ENABLE_CHECKPOINTING", defaults.enable_checkpointing),
            max_concurrent_images: env_parse("REEL_MAX_CONCURRENT_IMAGES", defaults.max_concurrent_images),
            max_concurrent_tts: env_parse("REEL_MAX_CONCURRENT_TTS", defaults.max_concurrent_tts),
            max_concurrent_videos: env_parse("REEL_MAX_CONCURRENT_VIDEOS", defaults.max_concurrent_videos),
            request_timeout: Duration::from_secs(env_parse("REEL_REQUEST_TIMEOUT_SECS", 120)),
            ffmpeg_timeout: Duration::from_secs(env_parse("REEL_FFMPEG_TIMEOUT_SECS", 600)),
            ken_burns: env_bool("REEL_KEN_BURNS", defaults.ken_burns),
            music_volume: env_parse("REEL_MUSIC_VOLUME", defaults.music_volume),
            words_per_scene: env_parse("REEL_WORDS_PER_SCENE", defaults.words_per_scene),
            max_scenes: env_parse("REEL_MAX_SCENES", defaults.max_scenes),
            min_content_words: env_parse("REEL_MIN_CONTENT_WORDS", defaults.min_content_words),
            openai: OpenAiConfig {
                base_url: env_string("OPENAI_BASE_URL", &openai_defaults.base_url)
                    .trim_end_matches('/')
                    .to_string(),
                api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
                image_model: env_string("OPENAI_IMAGE_MODEL", &openai_defaults.image_model),
                image_quality: env_string("OPENAI_IMAGE_QUALITY", &openai_defaults.image_quality),
                tts_model: env_string("OPENAI_TTS_MODEL", &openai_defaults.tts_model),
                chat_model: env_string("OPENAI_CHAT_MODEL", &openai_defaults.chat_model),
                tts_voice: env_string("OPENAI_TTS_VOICE", &openai_defaults.tts_voice),
                tts_speed: env_parse("OPENAI_TTS_SPEED", openai_defaults.tts_speed),
            },
            sources: SourcesConfig {
                reddit_rate_limit: env_parse("REEL_REDDIT_RATE_LIMIT", source_defaults.reddit_rate_limit),
                hackernews_rate_limit: env_parse(
                    "REEL_HACKERNEWS_RATE_LIMIT",
                    source_defaults.hackernews_rate_limit,
                ),
                wikipedia_rate_limit: env_parse(
                    "REEL_WIKIPEDIA_RATE_LIMIT",
                    source_defaults.wikipedia_rate_limit,
                ),
                openlibrary_rate_limit: env_parse(
                    "REEL_OPENLIBRARY_RATE_LIMIT",
                    source_defaults.openlibrary_rate_limit,
                ),
                parallel_fetch: env_bool("REEL_PARALLEL_FETCH", source_defaults.parallel_fetch),
                user_agent: env_string("REEL_SOURCE_USER_AGENT", &source_defaults.user_agent),
            },
        }
    }

    /// Problems that would prevent generation from working, without
    /// touching external tools.
    pub fn settings_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.openai.api_key.is_none() {
            issues.push("OPENAI_API_KEY is not set".to_string());
        }
        for (name, value) in [
            ("REEL_MAX_CONCURRENT_IMAGES", self.max_concurrent_images),
            ("REEL_MAX_CONCURRENT_TTS", self.max_concurrent_tts),
            ("REEL_MAX_CONCURRENT_VIDEOS", self.max_concurrent_videos),
            ("REEL_WORDS_PER_SCENE", self.words_per_scene),
            ("REEL_MAX_SCENES", self.max_scenes),
        ] {
            if value == 0 {
                issues.push(format!("{} must be at least 1", name));
            }
        }
        if !TTS_VOICES.contains(&self.openai.tts_voice.as_str()) {
            issues.push(format!(
                "OPENAI_TTS_VOICE '{}' is not one of {}",
                self.openai.tts_voice,
                TTS_VOICES.join(", ")
            ));
        }
        if !(0.25..=4.0).contains(&self.openai.tts_speed) {
            issues.push(format!("OPENAI_TTS_SPEED {} is outside 0.25..=4.0", self.openai.tts_speed));
        }
        if !(0.0..=1.0).contains(&self.music_volume) {
            issues.push(format!("REEL_MUSIC_VOLUME {} is outside 0.0..=1.0", self.music_volume));
        }
        issues
    }

    /// Eager check run before any generation work: settings, FFmpeg tools
    /// on PATH and a writable output directory. Every problem is reported
    /// in one error.
    pub fn validate(&self) -> WorkerResult<()> {
        let mut issues = self.settings_issues();

        for tool in ["ffmpeg", "ffprobe"] {
            if which::which(tool).is_err() {
                issues.push(format!("{} not found on PATH", tool));
            }
        }
        if let Err(e) = std::fs::create_dir_all(&self.output_dir) {
            issues.push(format!(
                "output directory {} cannot be created: {}",
                self.output_dir.display(),
                e
            ));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(WorkerError::config(issues.join("; ")))
        }
    }

    pub fn niche_dir(&self, niche: Niche) -> PathBuf {
        self.output_dir.join(niche.as_str())
    }

    pub fn scripts_dir(&self, niche: Niche) -> PathBuf {
        self.niche_dir(niche).join("scripts")
    }

    pub fn checkpoints_dir(&self, niche: Niche) -> PathBuf {
        self.niche_dir(niche).join(".checkpoints")
    }

    /// Artifact paths for one script.
    pub fn layout(&self, script: &Script) -> ArtifactLayout {
        ArtifactLayout::new(&self.niche_dir(script.niche), script.niche, &script.safe_title())
    }

    /// Same as [`PipelineConfig::default`] but rooted at `output_dir`.
    pub fn with_output_dir(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}
