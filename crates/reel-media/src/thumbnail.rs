//! Thumbnail frame extraction.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Grab one frame at `at_seconds`, scaled to `width` (height keeps aspect).
pub async fn extract_thumbnail(
    runner: &FfmpegRunner,
    video: impl AsRef<Path>,
    output: impl AsRef<Path>,
    at_seconds: f64,
    width: u32,
) -> MediaResult<()> {
    let video = video.as_ref();
    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }

    runner
        .run(&thumbnail_command(video, output, at_seconds, width))
        .await
}

fn thumbnail_command(
    video: impl AsRef<Path>,
    output: impl AsRef<Path>,
    at_seconds: f64,
    width: u32,
) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input_with_args(["-ss".to_string(), format!("{:.3}", at_seconds.max(0.0))], video)
        .single_frame()
        .video_filter(format!("scale={}:-2", width))
}
