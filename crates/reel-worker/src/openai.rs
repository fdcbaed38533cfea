//! OpenAI-compatible client for images, narration and script enhancement.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use reel_models::{Niche, Platform, Scene, Script, VisualStyle};

use crate::config::OpenAiConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::retry::{retry_if, RetryPolicy};
use crate::services::{ImageGenerator, ScriptEnhancer, SpeechGenerator};

const ENHANCE_SYSTEM_PROMPT: &str = "You are an expert content creator for short-form videos. \
Enhance scripts for engagement while keeping the original story. Improve narration flow and \
emotional impact, make image prompts vivid and visually consistent, keep scenes concise and \
describe a visual style shared by all scenes. Reply with valid JSON only.";

/// Failure of one API call, classified for retry.
#[derive(Debug, Error)]
enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unexpected response: {0}")]
    Response(String),
}

impl ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(e) => !e.is_decode(),
            ApiError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            ApiError::Response(_) => false,
        }
    }
}

impl From<ApiError> for WorkerError {
    fn from(e: ApiError) -> Self {
        WorkerError::generation(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Shape the enhancer asks the chat model to reply with.
#[derive(Debug, Deserialize)]
struct Enhancement {
    #[serde(default)]
    visual_style: Option<VisualStyle>,
    #[serde(default)]
    scenes: Vec<EnhancedScene>,
}

#[derive(Debug, Deserialize)]
struct EnhancedScene {
    scene_number: u32,
    narration: Option<String>,
    image_prompt: Option<String>,
}

pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
    api_key: String,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig, timeout: Duration) -> WorkerResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| WorkerError::config("OPENAI_API_KEY is not set"))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WorkerError::config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
            retry: RetryPolicy::new("openai"),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post_once<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response, ApiError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status { status, body })
        }
    }

    async fn post_json<B, R>(&self, operation: &str, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let policy = RetryPolicy {
            operation: operation.to_string(),
            ..self.retry.clone()
        };
        retry_if(&policy, ApiError::is_retryable, || async move {
            Ok::<R, ApiError>(self.post_once(path, body).await?.json::<R>().await?)
        })
        .await
    }

    async fn post_bytes<B: Serialize + ?Sized>(&self, operation: &str, path: &str, body: &B) -> Result<Vec<u8>, ApiError> {
        let policy = RetryPolicy {
            operation: operation.to_string(),
            ..self.retry.clone()
        };
        retry_if(&policy, ApiError::is_retryable, || async move {
            Ok::<Vec<u8>, ApiError>(self.post_once(path, body).await?.bytes().await?.to_vec())
        })
        .await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                body: format!("image download from {}", url),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Generate one image and return its bytes.
    pub async fn generate_image(&self, prompt: &str, platform: Platform) -> WorkerResult<Vec<u8>> {
        let request = ImageRequest {
            model: &self.config.image_model,
            prompt,
            size: platform.image_size(),
            quality: &self.config.image_quality,
            n: 1,
        };
        let response: ImageResponse = self.post_json("image generation", "images/generations", &request).await?;
        let image = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Response("no image data in response".to_string()))?;

        let bytes = match (image.b64_json, image.url) {
            (Some(encoded), _) => base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| ApiError::Response(format!("invalid base64 image: {}", e)))?,
            (None, Some(url)) => self.download(&url).await?,
            (None, None) => {
                return Err(ApiError::Response("image has neither b64_json nor url".to_string()).into())
            }
        };
        Ok(bytes)
    }

    /// Synthesize `text` to MP3 bytes.
    pub async fn generate_speech(&self, text: &str) -> WorkerResult<Vec<u8>> {
        let request = SpeechRequest {
            model: &self.config.tts_model,
            input: text,
            voice: &self.config.tts_voice,
            speed: self.config.tts_speed,
            response_format: "mp3",
        };
        let bytes = self.post_bytes("speech generation", "audio/speech", &request).await?;
        if bytes.is_empty() {
            return Err(ApiError::Response("empty audio response".to_string()).into());
        }
        Ok(bytes)
    }

    /// Ask the chat model for a JSON object and return its text.
    pub async fn chat_json(&self, system: &str, user: &str) -> WorkerResult<String> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            temperature: 0.7,
        };
        let response: ChatResponse = self.post_json("chat completion", "chat/completions", &request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ApiError::Response("no content in chat response".to_string()).into())
    }
}

fn full_image_prompt(scene: &Scene, style_suffix: &str) -> String {
    if style_suffix.is_empty() {
        scene.image_prompt.clone()
    } else {
        format!("{}. {}", scene.image_prompt, style_suffix)
    }
}

async fn write_artifact(output: &Path, bytes: &[u8]) -> WorkerResult<PathBuf> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output, bytes).await?;
    Ok(output.to_path_buf())
}

fn enhancement_prompt(script: &Script) -> WorkerResult<String> {
    let scenes: Vec<serde_json::Value> = script
        .scenes
        .iter()
        .map(|s| {
            serde_json::json!({
                "scene_number": s.scene_number,
                "narration": s.narration,
                "image_prompt": s.image_prompt,
            })
        })
        .collect();

    Ok(format!(
        r#"Enhance this {niche} script.

Title: {title}
Scenes: {scenes}

Return a JSON object with:
{{
  "visual_style": {{
    "environment": "consistent environment description",
    "color_mood": "color palette and mood",
    "texture": "surface and material details",
    "recurring_elements": {{"element_name": "description"}}
  }},
  "scenes": [
    {{"scene_number": 1, "narration": "enhanced narration", "image_prompt": "enhanced image prompt"}}
  ]
}}
Keep the same number of scenes and the same scene numbers."#,
        niche = script.niche,
        title = script.title,
        scenes = serde_json::to_string(&scenes)?,
    ))
}

/// Strip a Markdown code fence some models wrap JSON in.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Merge a chat reply into `original`. The title and scene numbering never
/// change, so the script keeps its safe title and checkpoint.
fn apply_enhancement(original: &Script, reply: &str) -> WorkerResult<Script> {
    let enhancement: Enhancement = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| WorkerError::generation(format!("enhancement reply is not valid JSON: {}", e)))?;

    let mut enhanced = original.clone();
    for scene in &mut enhanced.scenes {
        let Some(update) = enhancement
            .scenes
            .iter()
            .find(|s| s.scene_number == scene.scene_number)
        else {
            continue;
        };
        if let Some(narration) = update.narration.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            scene.narration = narration.to_string();
            scene.duration_estimate = scene.estimated_duration_from_words();
        }
        if let Some(prompt) = update.image_prompt.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            scene.image_prompt = prompt.to_string();
        }
    }
    if let Some(style) = enhancement.visual_style {
        enhanced.visual_style = Some(style);
    }
    enhanced.enhanced_at = Some(Utc::now());
    enhanced.validate()?;
    Ok(enhanced)
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate_for_scene(
        &self,
        scene: &Scene,
        niche: Niche,
        platform: Platform,
        style_suffix: &str,
        output: &Path,
    ) -> WorkerResult<PathBuf> {
        let prompt = full_image_prompt(scene, style_suffix);
        debug!(
            scene_number = scene.scene_number,
            niche = %niche,
            platform = %platform,
            "Generating image"
        );
        let bytes = self.generate_image(&prompt, platform).await?;
        write_artifact(output, &bytes).await
    }
}

#[async_trait]
impl SpeechGenerator for OpenAiClient {
    async fn generate_for_scene(&self, scene: &Scene, niche: Niche, output: &Path) -> WorkerResult<PathBuf> {
        debug!(scene_number = scene.scene_number, niche = %niche, "Generating narration");
        let bytes = self.generate_speech(&scene.narration).await?;
        write_artifact(output, &bytes).await
    }

    async fn measure_duration(&self, path: &Path) -> WorkerResult<f64> {
        Ok(reel_media::probe_duration(path).await?)
    }
}

#[async_trait]
impl ScriptEnhancer for OpenAiClient {
    async fn enhance(&self, script: &Script) -> WorkerResult<Script> {
        info!(title = %script.title, scenes = script.scenes.len(), "Enhancing script");
        let reply = self
            .chat_json(ENHANCE_SYSTEM_PROMPT, &enhancement_prompt(script)?)
            .await?;
        apply_enhancement(script, &reply)
    }
}
