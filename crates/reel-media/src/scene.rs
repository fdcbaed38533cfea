//! Still-image + narration scene segments.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::progress::ProgressMilestones;

/// Output frame rate for scene segments.
pub const SCENE_FPS: u32 = 25;

/// Everything needed to render one scene segment.
#[derive(Debug, Clone)]
pub struct SceneSegmentSpec {
    pub image: PathBuf,
    pub audio: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Expected segment length in seconds; drives the zoom length.
    pub duration: f64,
    /// Slow zoom over the still image.
    pub ken_burns: bool,
}

impl SceneSegmentSpec {
    /// Filter graph that fits the image into the frame and labels it `[v]`.
    pub fn filter_graph(&self) -> String {
        let (w, h) = (self.width, self.height);
        let fit = format!(
            "[0:v]scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2"
        );

        if self.ken_burns {
            let frames = ((self.duration.max(0.0) * SCENE_FPS as f64) as u64).max(1);
            format!(
                "{fit},zoompan=z='min(zoom+0.0005,1.05)':d={frames}:s={w}x{h}:fps={SCENE_FPS}[v]"
            )
        } else {
            format!("{fit},fps={SCENE_FPS}[v]")
        }
    }

    /// FFmpeg command rendering this segment into `output`.
    pub fn command(&self, output: impl AsRef<Path>) -> FfmpegCommand {
        FfmpegCommand::new(output)
            .input_with_args(["-loop", "1"], &self.image)
            .input(&self.audio)
            .filter_complex(self.filter_graph())
            .map("[v]")
            .map("1:a")
            .video_codec("libx264")
            .preset("medium")
            .crf(23)
            .audio_codec("aac")
            .audio_bitrate("192k")
            .shortest()
            .pixel_format("yuv420p")
    }
}

/// Render one scene segment.
pub async fn render_scene_segment(
    runner: &FfmpegRunner,
    spec: &SceneSegmentSpec,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let output = output.as_ref();

    for input in [&spec.image, &spec.audio] {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.clone()));
        }
    }

    let milestones = ProgressMilestones::new(spec.duration);
    let label = output.display().to_string();
    runner
        .run_with_progress(&spec.command(output), move |progress| {
            if let Some(percent) = milestones.observe(&progress) {
                debug!(output = %label, percent, speed = progress.speed, "Scene segment progress");
            }
        })
        .await?;

    info!(
        output = %output.display(),
        duration = spec.duration,
        "Rendered scene segment"
    );
    Ok(())
}
