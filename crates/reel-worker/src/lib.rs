//! Resumable short-form video pipeline.
//!
//! This crate provides:
//! - The `Orchestrator` that sequences scripts through their stages
//! - A bounded, order-preserving `WorkerPool`
//! - Checkpoint persistence for crash/resume
//! - Collaborator traits plus OpenAI, FFmpeg and SRT implementations
//! - Configuration, logging and the `reel` CLI

pub mod checkpoint_store;
pub mod config;
pub mod error;
pub mod ffmpeg_assembler;
pub mod layout;
pub mod logging;
pub mod openai;
pub mod orchestrator;
pub mod pool;
pub mod retry;
pub mod scripts;
pub mod services;
pub mod stages;
pub mod subtitles;

pub use checkpoint_store::CheckpointStore;
pub use config::{OpenAiConfig, PipelineConfig, SourcesConfig};
pub use error::{WorkerError, WorkerResult};
pub use ffmpeg_assembler::FfmpegVideoAssembler;
pub use layout::ArtifactLayout;
pub use logging::{init_tracing, JobLogger};
pub use openai::OpenAiClient;
pub use orchestrator::{Orchestrator, RunOptions};
pub use pool::{PoolOutcome, Slot, WorkItem, WorkerPool};
pub use retry::RetryPolicy;
pub use scripts::ScriptStore;
pub use services::{
    Collaborators, ImageGenerator, SceneVideoRequest, ScriptEnhancer, SpeechGenerator,
    SubtitleGenerator, ThumbnailGenerator, VideoAssembler,
};
pub use subtitles::SrtSubtitleWriter;
