//! Script files on disk.
//!
//! Scripts live under `<niche>/scripts/` as `<safeTitle>_script.json`; an
//! enhanced rewrite is kept next to it as `<safeTitle>_enhanced.json`.

use std::path::{Path, PathBuf};

use reel_models::Script;
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};

const SCRIPT_SUFFIX: &str = "_script.json";
const ENHANCED_SUFFIX: &str = "_enhanced.json";

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptStore;

impl ScriptStore {
    pub fn new() -> Self {
        Self
    }

    pub fn script_path(&self, dir: &Path, script: &Script) -> PathBuf {
        dir.join(format!("{}{}", script.safe_title(), SCRIPT_SUFFIX))
    }

    pub fn enhanced_path(&self, dir: &Path, script: &Script) -> PathBuf {
        dir.join(format!("{}{}", script.safe_title(), ENHANCED_SUFFIX))
    }

    /// Read, normalize and validate one script file.
    pub async fn load(&self, path: &Path) -> WorkerResult<Script> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            WorkerError::invalid_input(format!("cannot read script {}: {}", path.display(), e))
        })?;
        Script::from_json(&json).map_err(|e| {
            WorkerError::invalid_input(format!("{}: {}", path.display(), e))
        })
    }

    /// Up to `count` scripts from `dir`, in file-name order. Files that do
    /// not parse are skipped with a warning.
    pub async fn load_existing(&self, dir: &Path, count: usize) -> WorkerResult<Vec<(PathBuf, Script)>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_script = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(SCRIPT_SUFFIX));
            if is_script {
                files.push(path);
            }
        }
        files.sort();

        let mut scripts = Vec::new();
        for path in files {
            if scripts.len() >= count {
                break;
            }
            match self.load(&path).await {
                Ok(script) => scripts.push((path, script)),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable script"),
            }
        }

        debug!(dir = %dir.display(), loaded = scripts.len(), "Loaded existing scripts");
        Ok(scripts)
    }

    /// Write `script` as `<safeTitle>_script.json` under `dir`.
    pub async fn save(&self, script: &Script, dir: &Path) -> WorkerResult<PathBuf> {
        let path = self.script_path(dir, script);
        write_script(script, &path).await?;
        Ok(path)
    }

    pub async fn save_enhanced(&self, script: &Script, dir: &Path) -> WorkerResult<PathBuf> {
        let path = self.enhanced_path(dir, script);
        write_script(script, &path).await?;
        Ok(path)
    }

    /// The enhanced rewrite saved by an earlier run, if any.
    pub async fn load_enhanced(&self, dir: &Path, script: &Script) -> Option<Script> {
        let path = self.enhanced_path(dir, script);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return None;
        }
        match self.load(&path).await {
            Ok(enhanced) => Some(enhanced),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable enhanced script");
                None
            }
        }
    }
}

async fn write_script(script: &Script, path: &Path) -> WorkerResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, script.to_json()?).await?;
    Ok(())
}
