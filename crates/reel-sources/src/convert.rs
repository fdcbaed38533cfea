//! Turn fetched content into a narration script.

use reel_models::{Niche, RawContent, Scene, Script};

use crate::error::SourceResult;

pub const DEFAULT_WORDS_PER_SCENE: usize = 150;
pub const DEFAULT_MAX_SCENES: usize = 10;

/// Words from the start of the narration considered for prompt keywords.
const PROMPT_WINDOW_WORDS: usize = 30;
const PROMPT_KEYWORDS: usize = 5;

fn niche_visual_base(niche: Niche) -> &'static str {
    match niche {
        Niche::ScaryStories => "Dark atmospheric scene, horror movie cinematography",
        Niche::Finance => "Professional business visualization, modern minimalist",
        Niche::Luxury => "Elegant luxury aesthetic, cinematic lighting",
        Niche::TrueCrime => "Documentary style, dramatic noir lighting",
        Niche::History => "Historical scene, period-accurate, epic",
        Niche::SpaceAstronomy => "Space visualization, cosmic, awe-inspiring",
        Niche::TechGadgets => "Modern technology, sleek design, professional",
        Niche::AiFutureTech => "Futuristic, sci-fi aesthetic, advanced technology",
        _ => "Professional visualization",
    }
}

/// A simple image prompt: niche look, scene position and a few long words
/// from the narration.
pub fn basic_image_prompt(narration: &str, niche: Niche, scene_number: usize, total_scenes: usize) -> String {
    let base = niche_visual_base(niche);
    let base = if scene_number == 1 {
        format!("Opening shot, {}", base)
    } else if scene_number == total_scenes {
        format!("Climactic scene, {}", base)
    } else {
        base.to_string()
    };

    let keywords: Vec<String> = narration
        .split_whitespace()
        .take(PROMPT_WINDOW_WORDS)
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() > 4)
        .take(PROMPT_KEYWORDS)
        .collect();

    format!(
        "{}, {}, cinematic composition, dramatic lighting",
        base,
        keywords.join(", ")
    )
}

/// Split content into scenes of at least `words_per_scene` words.
///
/// Paragraphs (blank-line separated) are merged until the target is
/// reached; the remainder becomes a final shorter scene. At most
/// `max_scenes` scenes are produced.
pub fn split_into_scenes(text: &str, words_per_scene: usize, max_scenes: usize) -> Vec<String> {
    let mut scenes = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(paragraph);

        if current.split_whitespace().count() >= words_per_scene {
            scenes.push(std::mem::take(&mut current));
            if scenes.len() >= max_scenes {
                return scenes;
            }
        }
    }

    if !current.is_empty() && scenes.len() < max_scenes {
        scenes.push(current);
    }
    scenes
}

/// Build a validated script from one piece of raw content.
pub fn content_to_script(
    content: &RawContent,
    niche: Niche,
    words_per_scene: usize,
    max_scenes: usize,
) -> SourceResult<Script> {
    let narrations = split_into_scenes(&content.content, words_per_scene.max(1), max_scenes.max(1));
    let total = narrations.len();
    let scenes = narrations
        .into_iter()
        .enumerate()
        .map(|(i, narration)| {
            let prompt = basic_image_prompt(&narration, niche, i + 1, total);
            Scene::new(i as u32 + 1, narration, prompt)
        })
        .collect();

    let mut script = Script::new(content.title.as_str(), niche, scenes);
    script.source = content.source_type.as_str().to_string();
    script.author = content.author.clone().unwrap_or_default();
    script.url = content.source_url.clone();
    script.validate()?;
    Ok(script)
}
