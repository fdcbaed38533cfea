//! Narration scripts and their scenes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::niche::Niche;
use crate::utils::slugify;

/// Narration speed used to estimate scene length (150 words per minute).
pub const WORDS_PER_SECOND: f64 = 2.5;

/// Shortest duration a scene may carry.
pub const MIN_SCENE_DURATION: f64 = 0.1;

/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Cross-scene hints that keep generated imagery consistent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualStyle {
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub color_mood: String,
    #[serde(default)]
    pub texture: String,
    #[serde(default)]
    pub recurring_elements: BTreeMap<String, String>,
}

impl VisualStyle {
    /// Render the style as a suffix appended to every image prompt.
    pub fn to_prompt_suffix(&self) -> String {
        let mut parts = Vec::new();
        if !self.environment.is_empty() {
            parts.push(format!("Setting: {}", self.environment));
        }
        if !self.color_mood.is_empty() {
            parts.push(format!("Color mood: {}", self.color_mood));
        }
        if !self.texture.is_empty() {
            parts.push(format!("Textures: {}", self.texture));
        }
        parts.join(" | ")
    }
}

/// One narrated unit of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub scene_number: u32,
    pub narration: String,
    pub image_prompt: String,
    /// Seconds. Estimated from the word count until real audio is measured.
    #[serde(default)]
    pub duration_estimate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<PathBuf>,
}

impl Scene {
    /// Create a scene with a word-count based duration estimate.
    pub fn new(
        scene_number: u32,
        narration: impl Into<String>,
        image_prompt: impl Into<String>,
    ) -> Self {
        let mut scene = Self {
            scene_number,
            narration: narration.into().trim().to_string(),
            image_prompt: image_prompt.into().trim().to_string(),
            duration_estimate: 0.0,
            image_path: None,
            audio_path: None,
            video_path: None,
        };
        scene.duration_estimate = scene.estimated_duration_from_words();
        scene
    }

    pub fn word_count(&self) -> usize {
        self.narration.split_whitespace().count()
    }

    pub fn estimated_duration_from_words(&self) -> f64 {
        (self.word_count() as f64 / WORDS_PER_SECOND).max(MIN_SCENE_DURATION)
    }
}

/// A complete video script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub niche: Niche,
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_style: Option<VisualStyle>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_at: Option<DateTime<Utc>>,
}

impl Script {
    pub fn new(title: impl Into<String>, niche: Niche, scenes: Vec<Scene>) -> Self {
        let mut script = Self {
            title: title.into(),
            niche,
            scenes,
            source: String::new(),
            author: String::new(),
            url: String::new(),
            visual_style: None,
            created_at: Utc::now(),
            enhanced_at: None,
        };
        script.normalize();
        script
    }

    /// Parse a script from JSON, normalizing and validating it.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let mut script: Script = serde_json::from_str(json)
            .map_err(|e| ModelError::invalid_script(format!("malformed JSON: {}", e)))?;
        script.normalize();
        script.validate()?;
        Ok(script)
    }

    /// Pretty JSON representation.
    pub fn to_json(&self) -> ModelResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ModelError::invalid_script(format!("serialization failed: {}", e)))
    }

    /// Trim text fields, renumber scenes 1..N in order and fill in missing
    /// duration estimates.
    pub fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
        for (i, scene) in self.scenes.iter_mut().enumerate() {
            scene.scene_number = i as u32 + 1;
            scene.narration = scene.narration.trim().to_string();
            scene.image_prompt = scene.image_prompt.trim().to_string();
            if !scene.duration_estimate.is_finite() || scene.duration_estimate <= 0.0 {
                scene.duration_estimate = scene.estimated_duration_from_words();
            }
            scene.duration_estimate = scene.duration_estimate.max(MIN_SCENE_DURATION);
        }
    }

    /// Check structural constraints and report every violation found.
    pub fn validate(&self) -> ModelResult<()> {
        let mut problems = Vec::new();

        if self.title.is_empty() {
            problems.push("title must not be empty".to_string());
        }
        if self.title.chars().count() > MAX_TITLE_CHARS {
            problems.push(format!("title exceeds {} characters", MAX_TITLE_CHARS));
        }
        if self.scenes.is_empty() {
            problems.push("script must contain at least one scene".to_string());
        }
        for scene in &self.scenes {
            if scene.narration.is_empty() {
                problems.push(format!("scene {} has empty narration", scene.scene_number));
            }
            if scene.image_prompt.is_empty() {
                problems.push(format!("scene {} has empty image prompt", scene.scene_number));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ModelError::InvalidScript(problems))
        }
    }

    /// Stable filesystem identity of the script.
    pub fn safe_title(&self) -> String {
        slugify(&self.title)
    }

    pub fn total_duration(&self) -> f64 {
        self.scenes.iter().map(|s| s.duration_estimate).sum()
    }

    pub fn total_words(&self) -> usize {
        self.scenes.iter().map(Scene::word_count).sum()
    }

    pub fn get_scene(&self, scene_number: u32) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.scene_number == scene_number)
    }

    /// Prompt suffix from the visual style, empty when there is none.
    pub fn style_suffix(&self) -> String {
        self.visual_style
            .as_ref()
            .map(VisualStyle::to_prompt_suffix)
            .unwrap_or_default()
    }
}
