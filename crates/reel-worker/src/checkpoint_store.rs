//! Durable storage of per-script checkpoints.
//!
//! One JSON file per script, named from the script's safe title. Writes go
//! through a temp file in the same directory followed by a rename, so a
//! crash mid-save never leaves a half-written checkpoint behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use reel_models::Checkpoint;
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    enabled: bool,
}

impl CheckpointStore {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Read a checkpoint. `Ok(None)` when there is no file (or checkpointing
    /// is off); a file that exists but does not parse is an error.
    pub async fn load(&self, path: &Path) -> WorkerResult<Option<Checkpoint>> {
        if !self.enabled {
            return Ok(None);
        }

        let data = match tokio::fs::read_to_string(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(WorkerError::checkpoint(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&data).map(Some).map_err(|e| {
            WorkerError::checkpoint(format!("corrupt checkpoint {}: {}", path.display(), e))
        })
    }

    /// Load the checkpoint at `path`, or start a fresh one for `script_path`
    /// when it is missing or unreadable.
    pub async fn load_or_create(&self, path: &Path, script_path: &Path) -> Checkpoint {
        match self.load(path).await {
            Ok(Some(checkpoint)) => {
                debug!(
                    path = %path.display(),
                    completed = ?checkpoint.completed_stages,
                    "Resuming from checkpoint"
                );
                checkpoint
            }
            Ok(None) => Checkpoint::new(script_path),
            Err(e) => {
                warn!(error = %e, "Starting over with a fresh checkpoint");
                Checkpoint::new(script_path)
            }
        }
    }

    /// Persist `checkpoint` to `path`. No-op when checkpointing is off.
    pub async fn save(&self, checkpoint: &Checkpoint, path: &Path) -> WorkerResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let json = serde_json::to_vec_pretty(checkpoint)?;
        let target: PathBuf = path.to_path_buf();

        tokio::task::spawn_blocking(move || write_atomically(&target, &json))
            .await
            .map_err(|e| WorkerError::checkpoint(format!("save task failed: {}", e)))??;

        debug!(path = %path.display(), status = %checkpoint.status, "Checkpoint saved");
        Ok(())
    }
}

fn write_atomically(target: &Path, bytes: &[u8]) -> WorkerResult<()> {
    let dir = target
        .parent()
        .ok_or_else(|| WorkerError::checkpoint(format!("{} has no parent directory", target.display())))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target)
        .map_err(|e| WorkerError::checkpoint(format!("cannot replace {}: {}", target.display(), e)))?;
    Ok(())
}
