//! Structured logging for pipeline jobs.
//!
//! [`JobLogger`] gives consistent job lifecycle lines; [`init_tracing`]
//! installs the subscriber used by the `reel` binary.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_models::{JobId, Script};

/// Job logger bound to one job and operation.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    /// Create a logger for a job and operation (e.g. "generate", "fetch").
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span covering the processing of one script. Everything logged while
    /// the span is entered carries the job and script identity; the span
    /// closes when the instrumented future finishes, on every exit path.
    pub fn script_span(&self, script: &Script) -> Span {
        tracing::info_span!(
            "script",
            job_id = %self.job_id,
            operation = %self.operation,
            script = %script.safe_title(),
            niche = %script.niche,
        )
    }
}

/// Install the global subscriber. Pretty ANSI output by default, JSON when
/// `LOG_FORMAT=json`. `debug` raises the default level.
pub fn init_tracing(debug: bool) {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let level = if debug { "debug" } else { "info" };
    let mut env_filter = EnvFilter::from_default_env();
    for crate_name in ["reel", "reel_worker", "reel_sources", "reel_media"] {
        if let Ok(directive) = format!("{}={}", crate_name, level).parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(debug)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
