//! FFmpeg-backed video assembly and thumbnail extraction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reel_media::{
    concat_segments, extract_thumbnail, mix_background_music, probe_duration, render_scene_segment,
    FfmpegRunner, SceneSegmentSpec,
};
use reel_models::{Platform, Script};
use tokio::sync::watch;

use crate::config::PipelineConfig;
use crate::error::WorkerResult;
use crate::services::{SceneVideoRequest, ThumbnailGenerator, VideoAssembler};

/// Widest thumbnail we write.
const MAX_THUMBNAIL_WIDTH: u32 = 1280;

#[derive(Debug, Clone)]
pub struct FfmpegVideoAssembler {
    runner: FfmpegRunner,
    ken_burns: bool,
    music_volume: f32,
}

impl FfmpegVideoAssembler {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(config.ffmpeg_timeout.as_secs()),
            ken_burns: config.ken_burns,
            music_volume: config.music_volume,
        }
    }

    /// Kill running FFmpeg processes once `cancel` flips to `true`.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.runner = self.runner.with_cancel(cancel);
        self
    }

    pub fn segment_spec(&self, request: &SceneVideoRequest) -> SceneSegmentSpec {
        let (width, height) = request.platform.resolution();
        SceneSegmentSpec {
            image: request.image.clone(),
            audio: request.audio.clone(),
            width,
            height,
            duration: request.duration,
            ken_burns: self.ken_burns,
        }
    }
}

#[async_trait]
impl VideoAssembler for FfmpegVideoAssembler {
    async fn create_scene_video(&self, request: &SceneVideoRequest, output: &Path) -> WorkerResult<()> {
        render_scene_segment(&self.runner, &self.segment_spec(request), output).await?;
        Ok(())
    }

    async fn concatenate(&self, segments: &[PathBuf], output: &Path) -> WorkerResult<()> {
        concat_segments(&self.runner, segments, output).await?;
        Ok(())
    }

    async fn add_background_music(&self, video: &Path, music: &Path, output: &Path) -> WorkerResult<()> {
        mix_background_music(&self.runner, video, music, output, self.music_volume).await?;
        Ok(())
    }
}

#[async_trait]
impl ThumbnailGenerator for FfmpegVideoAssembler {
    async fn generate(
        &self,
        script: &Script,
        video: &Path,
        platform: Platform,
        output_dir: &Path,
    ) -> WorkerResult<Vec<PathBuf>> {
        let duration = probe_duration(video).await?;
        let output = thumbnail_path(output_dir, script, platform);
        let width = platform.resolution().0.min(MAX_THUMBNAIL_WIDTH);

        tokio::fs::create_dir_all(output_dir).await?;
        extract_thumbnail(&self.runner, video, &output, duration / 3.0, width).await?;
        Ok(vec![output])
    }
}

pub fn thumbnail_path(output_dir: &Path, script: &Script, platform: Platform) -> PathBuf {
    output_dir.join(format!("{}_{}.jpg", script.safe_title(), platform))
}
