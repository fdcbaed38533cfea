//! Segment concatenation and background music mixing.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Default background music level relative to narration.
pub const DEFAULT_MUSIC_VOLUME: f32 = 0.15;

/// Body of a concat-demuxer list file.
fn concat_list(segments: &[PathBuf]) -> MediaResult<String> {
    let mut list = String::new();
    for segment in segments {
        let absolute = std::path::absolute(segment)?;
        // Single quotes inside the path are closed, escaped and reopened.
        let escaped = absolute.to_string_lossy().replace('\'', r"'\''");
        list.push_str(&format!("file '{}'\n", escaped));
    }
    Ok(list)
}

/// Join segments in the given order without re-encoding.
pub async fn concat_segments(
    runner: &FfmpegRunner,
    segments: &[PathBuf],
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let output = output.as_ref();

    if segments.is_empty() {
        return Err(MediaError::invalid_input("No segments to concatenate"));
    }
    if let Some(missing) = segments.iter().find(|p| !p.exists()) {
        return Err(MediaError::FileNotFound(missing.clone()));
    }

    let list_dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);
    tokio::fs::create_dir_all(&list_dir).await?;

    let body = concat_list(segments)?;
    let list_file = tokio::task::spawn_blocking(move || -> std::io::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(".concat_")
            .suffix(".txt")
            .tempfile_in(list_dir)?;
        file.write_all(body.as_bytes())?;
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(|e| MediaError::Io(std::io::Error::other(e)))??;

    let cmd = FfmpegCommand::new(output)
        .input_with_args(["-f", "concat", "-safe", "0"], list_file.path())
        .output_args(["-c", "copy"]);

    // The list file is removed when `list_file` drops.
    runner.run(&cmd).await?;

    info!(
        segments = segments.len(),
        output = %output.display(),
        "Concatenated segments"
    );
    Ok(())
}

/// Command mixing looped, attenuated music under the video's own audio.
pub fn music_mix_command(
    video: impl AsRef<Path>,
    music: impl AsRef<Path>,
    output: impl AsRef<Path>,
    music_volume: f32,
) -> FfmpegCommand {
    let filter = format!(
        "[1:a]volume={music_volume}[music];[0:a][music]amix=inputs=2:duration=first:dropout_transition=2[aout]"
    );

    FfmpegCommand::new(output)
        .input(video)
        .input_with_args(["-stream_loop", "-1"], music)
        .filter_complex(filter)
        .map("0:v")
        .map("[aout]")
        .video_codec("copy")
        .audio_codec("aac")
        .audio_bitrate("192k")
        .shortest()
}

/// Mix background music into a finished video.
pub async fn mix_background_music(
    runner: &FfmpegRunner,
    video: impl AsRef<Path>,
    music: impl AsRef<Path>,
    output: impl AsRef<Path>,
    music_volume: f32,
) -> MediaResult<()> {
    let (video, music, output) = (video.as_ref(), music.as_ref(), output.as_ref());

    for input in [video, music] {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
    }

    runner
        .run(&music_mix_command(video, music, output, music_volume))
        .await?;

    info!(output = %output.display(), "Mixed background music");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_keeps_order_and_escapes_quotes() {
        let list = concat_list(&[
            PathBuf::from("/tmp/b.mp4"),
            PathBuf::from("/tmp/a.mp4"),
            PathBuf::from("/tmp/it's.mp4"),
        ])
        .unwrap();

        let lines: Vec<&str> = list.lines().collect();
        assert_eq!(lines[0], "file '/tmp/b.mp4'");
        assert_eq!(lines[1], "file '/tmp/a.mp4'");
        assert_eq!(lines[2], r"file '/tmp/it'\''s.mp4'");
    }

    #[tokio::test]
    async fn test_empty_concat_is_rejected() {
        let err = concat_segments(&FfmpegRunner::new(), &[], "out.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }

    #[test]
    fn test_music_mix_command() {
        let args = music_mix_command("v.mp4", "m.mp3", "o.mp4", 0.15)
            .build_args()
            .join(" ");
        assert!(args.contains("-stream_loop -1 -i m.mp3"));
        assert!(args.contains("volume=0.15"));
        assert!(args.contains("amix=inputs=2:duration=first"));
        assert!(args.contains("-c:v copy"));
    }
}
