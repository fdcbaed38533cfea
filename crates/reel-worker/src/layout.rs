//! On-disk artifact naming for one script.
//!
//! Every generated file has exactly one path, derived from the niche, the
//! script's safe title, the scene number and the platform. Generation is
//! therefore idempotent in effect and concurrent workers never share a path.

use std::path::{Path, PathBuf};

use reel_models::{Niche, Platform};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    niche_dir: PathBuf,
    niche: Niche,
    safe_title: String,
}

impl ArtifactLayout {
    pub fn new(niche_dir: &Path, niche: Niche, safe_title: &str) -> Self {
        Self {
            niche_dir: niche_dir.to_path_buf(),
            niche,
            safe_title: safe_title.to_string(),
        }
    }

    pub fn safe_title(&self) -> &str {
        &self.safe_title
    }

    pub fn images_dir(&self) -> PathBuf {
        self.niche_dir.join("images").join(&self.safe_title)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.niche_dir.join("audio").join(&self.safe_title)
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.niche_dir.join("videos").join(&self.safe_title)
    }

    pub fn final_dir(&self) -> PathBuf {
        self.niche_dir.join("final")
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.niche_dir.join("thumbnails")
    }

    pub fn subtitles_dir(&self) -> PathBuf {
        self.niche_dir.join("subtitles")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.niche_dir.join("scripts")
    }

    pub fn image_path(&self, scene_number: u32, platform: Platform) -> PathBuf {
        self.images_dir()
            .join(format!("scene_{:02}_{}.png", scene_number, platform))
    }

    pub fn audio_path(&self, scene_number: u32) -> PathBuf {
        self.audio_dir().join(format!("scene_{:02}.mp3", scene_number))
    }

    pub fn segment_path(&self, scene_number: u32, platform: Platform) -> PathBuf {
        self.videos_dir()
            .join(format!("scene_{:02}_{}.mp4", scene_number, platform))
    }

    pub fn concat_path(&self, platform: Platform) -> PathBuf {
        self.videos_dir().join(format!("concat_{}.mp4", platform))
    }

    pub fn final_video_path(&self, platform: Platform) -> PathBuf {
        self.final_dir()
            .join(format!("{}_{}_{}.mp4", self.niche, self.safe_title, platform))
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.niche_dir
            .join(".checkpoints")
            .join(format!("{}.checkpoint.json", self.safe_title))
    }

    /// Create every directory a run writes into.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.images_dir(),
            self.audio_dir(),
            self.videos_dir(),
            self.final_dir(),
            self.thumbnails_dir(),
            self.subtitles_dir(),
            self.scripts_dir(),
            self.niche_dir.join(".checkpoints"),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}
