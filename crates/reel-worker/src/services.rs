//! Collaborators the orchestrator calls out to.
//!
//! The orchestrator decides every output path; implementations only
//! produce the artifact at the path they are given. All of them must be
//! safe to call concurrently from several pool workers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reel_models::{Niche, Platform, Scene, Script};

use crate::error::WorkerResult;

/// Inputs for rendering one scene segment.
#[derive(Debug, Clone)]
pub struct SceneVideoRequest {
    pub scene_number: u32,
    pub image: PathBuf,
    pub audio: PathBuf,
    pub platform: Platform,
    /// Segment length in seconds.
    pub duration: f64,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate the image for one scene and write it to `output`.
    async fn generate_for_scene(
        &self,
        scene: &Scene,
        niche: Niche,
        platform: Platform,
        style_suffix: &str,
        output: &Path,
    ) -> WorkerResult<PathBuf>;
}

#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    /// Synthesize the narration of one scene into `output`.
    async fn generate_for_scene(&self, scene: &Scene, niche: Niche, output: &Path) -> WorkerResult<PathBuf>;

    /// Length of an audio file in seconds.
    async fn measure_duration(&self, path: &Path) -> WorkerResult<f64>;
}

#[async_trait]
pub trait VideoAssembler: Send + Sync {
    async fn create_scene_video(&self, request: &SceneVideoRequest, output: &Path) -> WorkerResult<()>;

    /// Join segments in the given order.
    async fn concatenate(&self, segments: &[PathBuf], output: &Path) -> WorkerResult<()>;

    async fn add_background_music(&self, video: &Path, music: &Path, output: &Path) -> WorkerResult<()>;
}

/// Optional rewrite pass over a script before generation.
#[async_trait]
pub trait ScriptEnhancer: Send + Sync {
    async fn enhance(&self, script: &Script) -> WorkerResult<Script>;
}

#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    async fn generate(
        &self,
        script: &Script,
        video: &Path,
        platform: Platform,
        output_dir: &Path,
    ) -> WorkerResult<Vec<PathBuf>>;
}

#[async_trait]
pub trait SubtitleGenerator: Send + Sync {
    async fn generate(&self, script: &Script, platform: Platform, output_dir: &Path) -> WorkerResult<PathBuf>;
}

/// Everything the orchestrator calls, injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub images: Arc<dyn ImageGenerator>,
    pub speech: Arc<dyn SpeechGenerator>,
    pub video: Arc<dyn VideoAssembler>,
    pub enhancer: Option<Arc<dyn ScriptEnhancer>>,
    pub thumbnails: Option<Arc<dyn ThumbnailGenerator>>,
    pub subtitles: Option<Arc<dyn SubtitleGenerator>>,
}

impl Collaborators {
    pub fn new(
        images: Arc<dyn ImageGenerator>,
        speech: Arc<dyn SpeechGenerator>,
        video: Arc<dyn VideoAssembler>,
    ) -> Self {
        Self {
            images,
            speech,
            video,
            enhancer: None,
            thumbnails: None,
            subtitles: None,
        }
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn ScriptEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn with_thumbnails(mut self, thumbnails: Arc<dyn ThumbnailGenerator>) -> Self {
        self.thumbnails = Some(thumbnails);
        self
    }

    pub fn with_subtitles(mut self, subtitles: Arc<dyn SubtitleGenerator>) -> Self {
        self.subtitles = Some(subtitles);
        self
    }
}
