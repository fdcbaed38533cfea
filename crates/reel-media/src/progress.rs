//! Parsing of FFmpeg `-progress pipe:2` output.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Snapshot of an encode in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    pub frame: u64,
    pub fps: f64,
    /// Encoded output time in milliseconds.
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime.
    pub speed: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Completed fraction (0.0..=1.0) of an output expected to last
    /// `expected_secs`.
    pub fn fraction_of(&self, expected_secs: f64) -> f64 {
        if expected_secs <= 0.0 {
            return 0.0;
        }
        if self.is_complete {
            return 1.0;
        }
        (self.out_time_ms as f64 / 1000.0 / expected_secs).clamp(0.0, 1.0)
    }
}

/// Incremental parser for `key=value` progress lines.
///
/// FFmpeg emits a block of keys terminated by `progress=continue|end`;
/// a snapshot is returned only at the end of each block.
#[derive(Debug, Default)]
pub struct ProgressParser {
    current: FfmpegProgress,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns `None` for lines that are not progress keys
    /// (regular stderr output) and for keys inside an unfinished block.
    pub fn feed(&mut self, line: &str) -> Option<FfmpegProgress> {
        let (key, value) = line.trim().split_once('=')?;
        let value = value.trim();

        match key {
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.current.frame = frame;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse() {
                    self.current.fps = fps;
                }
            }
            // Both keys carry microseconds despite the name.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_ms = us / 1000;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.current.speed = speed;
                }
            }
            "progress" => {
                self.current.is_complete = value == "end";
                return Some(self.current.clone());
            }
            _ => {}
        }

        None
    }

    /// Whether a line belongs to the progress protocol rather than a log.
    pub fn is_progress_line(line: &str) -> bool {
        const KEYS: [&str; 14] = [
            "frame", "fps", "stream_", "bitrate", "total_size", "out_time", "dup_frames",
            "drop_frames", "speed", "progress", "out_time_us", "out_time_ms", "q", "size",
        ];
        match line.trim().split_once('=') {
            Some((key, _)) => KEYS.iter().any(|k| key.starts_with(k)),
            None => false,
        }
    }
}

/// Reduces a stream of snapshots to quarter milestones for an output of
/// known length, so a render logs at 25, 50, 75 and 100 percent only.
#[derive(Debug)]
pub struct ProgressMilestones {
    expected_secs: f64,
    reached: AtomicU8,
}

impl ProgressMilestones {
    pub fn new(expected_secs: f64) -> Self {
        Self {
            expected_secs,
            reached: AtomicU8::new(0),
        }
    }

    /// Percentage of a milestone first reached by `progress`.
    pub fn observe(&self, progress: &FfmpegProgress) -> Option<u8> {
        let percent = if progress.is_complete {
            100
        } else {
            (progress.fraction_of(self.expected_secs) * 100.0) as u8
        };
        let milestone = percent / 25 * 25;
        if milestone == 0 {
            return None;
        }
        let previous = self.reached.fetch_max(milestone, Ordering::Relaxed);
        (milestone > previous).then_some(milestone)
    }
}
