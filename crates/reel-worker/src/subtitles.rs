//! SRT subtitles built from script narration and scene timing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reel_models::{Platform, Script};
use tracing::info;

use crate::error::WorkerResult;
use crate::services::SubtitleGenerator;

/// Longest subtitle line before wrapping.
pub const MAX_LINE_CHARS: usize = 42;

#[derive(Debug, Clone)]
pub struct SrtSubtitleWriter {
    max_line_chars: usize,
}

impl Default for SrtSubtitleWriter {
    fn default() -> Self {
        Self {
            max_line_chars: MAX_LINE_CHARS,
        }
    }
}

impl SrtSubtitleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// One cue per scene, back to back, timed from `duration_estimate`.
    pub fn render(&self, script: &Script) -> String {
        let mut out = String::new();
        let mut start = 0.0;
        let mut index = 1;

        for scene in &script.scenes {
            let end = start + scene.duration_estimate;
            if !scene.narration.is_empty() {
                out.push_str(&format!(
                    "{}\n{} --> {}\n{}\n\n",
                    index,
                    srt_timestamp(start),
                    srt_timestamp(end),
                    wrap_text(&scene.narration, self.max_line_chars).join("\n")
                ));
                index += 1;
            }
            start = end;
        }
        out
    }
}

#[async_trait]
impl SubtitleGenerator for SrtSubtitleWriter {
    async fn generate(&self, script: &Script, platform: Platform, output_dir: &Path) -> WorkerResult<PathBuf> {
        tokio::fs::create_dir_all(output_dir).await?;
        let path = output_dir.join(format!("{}_{}.srt", script.safe_title(), platform));
        tokio::fs::write(&path, self.render(script)).await?;
        info!(path = %path.display(), "Subtitles written");
        Ok(path)
    }
}

/// `HH:MM:SS,mmm`
pub fn srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let (hours, rem) = (total_ms / 3_600_000, total_ms % 3_600_000);
    let (minutes, rem) = (rem / 60_000, rem % 60_000);
    let (secs, millis) = (rem / 1000, rem % 1000);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Greedy word wrap. A single word longer than `width` gets its own line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
