//! FFmpeg CLI wrapper for the reel pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - Timeout and cancellation support via tokio
//! - Scene segment rendering, concatenation, music mixing and thumbnails

pub mod command;
pub mod concat;
pub mod error;
pub mod probe;
pub mod progress;
pub mod scene;
pub mod thumbnail;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use concat::{concat_segments, mix_background_music, DEFAULT_MUSIC_VOLUME};
pub use error::{MediaError, MediaResult};
pub use probe::probe_duration;
pub use progress::{FfmpegProgress, ProgressMilestones, ProgressParser};
pub use scene::{render_scene_segment, SceneSegmentSpec, SCENE_FPS};
pub use thumbnail::extract_thumbnail;
