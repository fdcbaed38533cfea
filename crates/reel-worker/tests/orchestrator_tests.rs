//! End-to-end pipeline runs against in-process collaborators.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reel_models::{
    Checkpoint, ContentSourceType, JobStatus, Niche, Platform, RawContent, Scene, Script, Stage,
    StageOutcome,
};
use reel_sources::{AggregatorConfig, ContentAggregator, ContentSource, SourceCapabilities, SourceResult};
use reel_worker::{
    CheckpointStore, Collaborators, ImageGenerator, Orchestrator, PipelineConfig, RunOptions,
    SceneVideoRequest, ScriptEnhancer, ScriptStore, SpeechGenerator, SrtSubtitleWriter,
    ThumbnailGenerator, VideoAssembler, WorkerError, WorkerResult,
};
use tempfile::TempDir;
use tokio::sync::watch;

const MEASURED_SECS: f64 = 4.5;

async fn write_artifact(path: &Path, bytes: &[u8]) -> WorkerResult<PathBuf> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(path.to_path_buf())
}

#[derive(Default)]
struct FakeImages {
    calls: AtomicUsize,
    fail_all: bool,
    failing: Vec<u32>,
    cancel_on_call: Option<watch::Sender<bool>>,
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate_for_scene(
        &self,
        scene: &Scene,
        _niche: Niche,
        _platform: Platform,
        _style_suffix: &str,
        output: &Path,
    ) -> WorkerResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(cancel) = &self.cancel_on_call {
            let _ = cancel.send(true);
        }
        if self.fail_all || self.failing.contains(&scene.scene_number) {
            return Err(WorkerError::generation("image service unavailable"));
        }
        write_artifact(output, b"png").await
    }
}

#[derive(Default)]
struct FakeSpeech {
    calls: AtomicUsize,
}

#[async_trait]
impl SpeechGenerator for FakeSpeech {
    async fn generate_for_scene(&self, _scene: &Scene, _niche: Niche, output: &Path) -> WorkerResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        write_artifact(output, b"mp3").await
    }

    async fn measure_duration(&self, _path: &Path) -> WorkerResult<f64> {
        Ok(MEASURED_SECS)
    }
}

#[derive(Default)]
struct FakeVideo {
    segment_calls: AtomicUsize,
    durations: Mutex<Vec<f64>>,
    concatenated: Mutex<Vec<Vec<PathBuf>>>,
    music_mixes: Mutex<Vec<(PathBuf, PathBuf)>>,
}

#[async_trait]
impl VideoAssembler for FakeVideo {
    async fn create_scene_video(&self, request: &SceneVideoRequest, output: &Path) -> WorkerResult<()> {
        self.segment_calls.fetch_add(1, Ordering::SeqCst);
        self.durations.lock().unwrap().push(request.duration);
        write_artifact(output, b"segment").await?;
        Ok(())
    }

    async fn concatenate(&self, segments: &[PathBuf], output: &Path) -> WorkerResult<()> {
        self.concatenated.lock().unwrap().push(segments.to_vec());
        write_artifact(output, b"concat").await?;
        Ok(())
    }

    async fn add_background_music(&self, video: &Path, music: &Path, output: &Path) -> WorkerResult<()> {
        self.music_mixes
            .lock()
            .unwrap()
            .push((video.to_path_buf(), music.to_path_buf()));
        write_artifact(output, b"mixed").await?;
        Ok(())
    }
}

const ENHANCED_PREFIX: &str = "Picture this:";

#[derive(Default)]
struct FakeEnhancer {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ScriptEnhancer for FakeEnhancer {
    async fn enhance(&self, script: &Script) -> WorkerResult<Script> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(WorkerError::generation("chat model unavailable"));
        }
        let mut enhanced = script.clone();
        enhanced.title = "A Catchier Title".to_string();
        for scene in &mut enhanced.scenes {
            scene.narration = format!("{} {}", ENHANCED_PREFIX, scene.narration);
        }
        Ok(enhanced)
    }
}

#[derive(Default)]
struct FakeThumbnails;

#[async_trait]
impl ThumbnailGenerator for FakeThumbnails {
    async fn generate(
        &self,
        script: &Script,
        _video: &Path,
        platform: Platform,
        output_dir: &Path,
    ) -> WorkerResult<Vec<PathBuf>> {
        let path = output_dir.join(format!("{}_{}.jpg", script.safe_title(), platform));
        Ok(vec![write_artifact(&path, b"jpg").await?])
    }
}

struct FakeSource {
    items: Vec<RawContent>,
}

#[async_trait]
impl ContentSource for FakeSource {
    fn source_type(&self) -> ContentSourceType {
        ContentSourceType::Wikipedia
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::default()
    }

    fn supports_niche(&self, _niche: Niche) -> bool {
        true
    }

    async fn fetch_content(&self, _niche: Niche, _query: Option<&str>, limit: usize) -> SourceResult<Vec<RawContent>> {
        Ok(self.items.iter().take(limit).cloned().collect())
    }
}

struct Harness {
    _dir: TempDir,
    config: PipelineConfig,
    images: Arc<FakeImages>,
    speech: Arc<FakeSpeech>,
    video: Arc<FakeVideo>,
}

impl Harness {
    fn new() -> Self {
        Self::with_images(FakeImages::default())
    }

    fn with_images(images: FakeImages) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::with_output_dir(dir.path());
        config.max_concurrent_images = 2;
        config.max_concurrent_tts = 2;
        config.max_concurrent_videos = 2;
        Self {
            _dir: dir,
            config,
            images: Arc::new(images),
            speech: Arc::new(FakeSpeech::default()),
            video: Arc::new(FakeVideo::default()),
        }
    }

    fn build(
        &self,
        images: Arc<FakeImages>,
        video: Arc<FakeVideo>,
        enhancer: Option<Arc<FakeEnhancer>>,
    ) -> Orchestrator {
        let mut collaborators = Collaborators::new(images, self.speech.clone(), video)
            .with_thumbnails(Arc::new(FakeThumbnails))
            .with_subtitles(Arc::new(SrtSubtitleWriter::default()));
        if let Some(enhancer) = enhancer {
            collaborators = collaborators.with_enhancer(enhancer);
        }
        Orchestrator::new(self.config.clone(), collaborators)
    }

    /// Same output directory, fresh collaborators.
    fn rerun_with(&self, images: FakeImages) -> (Orchestrator, Arc<FakeImages>, Arc<FakeVideo>) {
        let images = Arc::new(images);
        let video = Arc::new(FakeVideo::default());
        (self.build(images.clone(), video.clone(), None), images, video)
    }

    fn orchestrator(&self) -> Orchestrator {
        self.build(self.images.clone(), self.video.clone(), None)
    }

    fn orchestrator_with_enhancer(&self, enhancer: Arc<FakeEnhancer>) -> Orchestrator {
        self.build(self.images.clone(), self.video.clone(), Some(enhancer))
    }

    async fn save_script(&self, script: &Script) -> PathBuf {
        ScriptStore::new()
            .save(script, &self.config.scripts_dir(script.niche))
            .await
            .unwrap()
    }

    async fn checkpoint(&self, script: &Script) -> Checkpoint {
        let path = self.config.layout(script).checkpoint_path();
        CheckpointStore::new(true).load(&path).await.unwrap().unwrap()
    }
}

fn three_scene_script() -> Script {
    Script::new(
        "Deep Sea Giants",
        Niche::AnimalFacts,
        vec![
            Scene::new(1, "The colossal squid lives in the cold Southern Ocean.", "a colossal squid"),
            Scene::new(2, "Its eyes are the largest in the animal kingdom.", "a giant eye in the dark"),
            Scene::new(3, "Sperm whales are its only known predator.", "a sperm whale diving"),
        ],
    )
}

fn script_options(path: PathBuf) -> RunOptions {
    RunOptions {
        script_path: Some(path),
        fetch_missing: false,
        ..RunOptions::default()
    }
}

fn long_text(topic: &str) -> String {
    (0..130).map(|i| format!("{}{}", topic, i)).collect::<Vec<_>>().join(" ")
}

#[tokio::test]
async fn test_fresh_run_produces_one_video() {
    let harness = Harness::new();
    let script = three_scene_script();
    let path = harness.save_script(&script).await;

    let results = harness
        .orchestrator()
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &script_options(path.clone()))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result.errors.is_empty());
    assert_eq!(result.status, JobStatus::Completed);
    assert_eq!(result.script_path.as_deref(), Some(path.as_path()));

    assert_eq!(harness.images.calls.load(Ordering::SeqCst), 3);
    assert_eq!(harness.speech.calls.load(Ordering::SeqCst), 3);
    assert_eq!(harness.video.segment_calls.load(Ordering::SeqCst), 3);

    // Segments are timed from measured audio, not word counts.
    assert_eq!(*harness.video.durations.lock().unwrap(), vec![MEASURED_SECS; 3]);

    let layout = harness.config.layout(&script);
    let concatenated = harness.video.concatenated.lock().unwrap().clone();
    assert_eq!(
        concatenated,
        vec![(1..=3).map(|n| layout.segment_path(n, Platform::Youtube)).collect::<Vec<_>>()]
    );

    assert_eq!(result.video_paths.len(), 1);
    let final_video = &result.video_paths[&Platform::Youtube];
    assert_eq!(final_video, &layout.final_video_path(Platform::Youtube));
    assert!(final_video.exists());
    assert_eq!(result.thumbnail_paths.len(), 1);
    assert!(result.subtitle_paths[&Platform::Youtube].exists());

    let checkpoint = harness.checkpoint(&script).await;
    assert_eq!(checkpoint.status, JobStatus::Completed);
    for stage in [Stage::Images, Stage::Audio, Stage::Videos, Stage::Thumbnails, Stage::Subtitles] {
        assert!(checkpoint.is_stage_complete(stage), "{} not complete", stage);
    }
    assert!(!checkpoint.is_stage_complete(Stage::Enhance));
    assert_eq!(
        checkpoint.outcome(Stage::Enhance),
        Some(&StageOutcome::skipped("not requested"))
    );
    assert_eq!(checkpoint.images_generated.len(), 3);
}

#[tokio::test]
async fn test_resume_only_generates_missing_image() {
    let harness = Harness::new();
    let script = three_scene_script();
    let path = harness.save_script(&script).await;
    let layout = harness.config.layout(&script);

    let mut checkpoint = Checkpoint::new(&path);
    for n in [1, 2] {
        std::fs::create_dir_all(layout.images_dir()).unwrap();
        std::fs::write(layout.image_path(n, Platform::Youtube), b"png").unwrap();
        checkpoint.mark_image_done(n);
    }
    let job_id = checkpoint.job_id.clone();
    CheckpointStore::new(true)
        .save(&checkpoint, &layout.checkpoint_path())
        .await
        .unwrap();

    let results = harness
        .orchestrator()
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &script_options(path))
        .await
        .unwrap();

    assert!(results[0].success, "errors: {:?}", results[0].errors);
    assert_eq!(harness.images.calls.load(Ordering::SeqCst), 1);

    let resumed = harness.checkpoint(&script).await;
    assert_eq!(resumed.job_id, job_id);
    assert_eq!(resumed.images_generated.len(), 3);
}

#[tokio::test]
async fn test_flagged_image_without_file_is_regenerated() {
    let harness = Harness::new();
    let script = three_scene_script();
    let path = harness.save_script(&script).await;
    let layout = harness.config.layout(&script);

    let mut checkpoint = Checkpoint::new(&path);
    for n in 1..=3 {
        checkpoint.mark_image_done(n);
    }
    checkpoint.mark_stage_complete(Stage::Images);
    CheckpointStore::new(true)
        .save(&checkpoint, &layout.checkpoint_path())
        .await
        .unwrap();

    let results = harness
        .orchestrator()
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &script_options(path))
        .await
        .unwrap();

    assert!(results[0].success);
    assert_eq!(harness.images.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_all_images_failing_is_recorded_and_audio_still_runs() {
    let harness = Harness::with_images(FakeImages {
        fail_all: true,
        ..FakeImages::default()
    });
    let script = three_scene_script();
    let path = harness.save_script(&script).await;

    let results = harness
        .orchestrator()
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &script_options(path))
        .await
        .unwrap();

    let result = &results[0];
    assert!(!result.success);
    assert_eq!(result.status, JobStatus::Completed);
    assert!(result
        .errors
        .contains(&"Image generation (youtube): no images were generated".to_string()));
    assert!(result
        .errors
        .iter()
        .any(|e| e.contains("no video segments were created successfully")));
    assert!(result.video_paths.is_empty());

    assert_eq!(harness.speech.calls.load(Ordering::SeqCst), 3);
    assert_eq!(harness.video.segment_calls.load(Ordering::SeqCst), 0);

    let checkpoint = harness.checkpoint(&script).await;
    assert!(!checkpoint.is_stage_complete(Stage::Images));
    assert!(checkpoint.is_stage_complete(Stage::Audio));
    assert_eq!(
        checkpoint.outcome(Stage::Thumbnails),
        Some(&StageOutcome::skipped("no final video was produced"))
    );
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let harness = Harness::new();
    let script = three_scene_script();
    let path = harness.save_script(&script).await;
    let options = script_options(path);

    let first = harness
        .orchestrator()
        .run(Niche::AnimalFacts, &[Platform::Youtube, Platform::Tiktok], 1, &options)
        .await
        .unwrap();
    assert!(first[0].success, "errors: {:?}", first[0].errors);
    assert_eq!(harness.images.calls.load(Ordering::SeqCst), 6);

    let (orchestrator, images, video) = harness.rerun_with(FakeImages::default());
    let second = orchestrator
        .run(Niche::AnimalFacts, &[Platform::Youtube, Platform::Tiktok], 1, &options)
        .await
        .unwrap();

    assert!(second[0].success);
    assert_eq!(images.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.speech.calls.load(Ordering::SeqCst), 3);
    assert_eq!(video.segment_calls.load(Ordering::SeqCst), 0);
    assert!(video.concatenated.lock().unwrap().is_empty());
    assert_eq!(first[0].video_paths, second[0].video_paths);
}

#[tokio::test]
async fn test_partial_failure_then_repair() {
    let harness = Harness::with_images(FakeImages {
        failing: vec![2],
        ..FakeImages::default()
    });
    let script = three_scene_script();
    let path = harness.save_script(&script).await;
    let options = script_options(path);

    let first = harness
        .orchestrator()
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &options)
        .await
        .unwrap();

    let result = &first[0];
    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|e| e.starts_with("Image generation (youtube, scene 2)")));
    // The video is built from the scenes that made it.
    assert!(result.video_paths.contains_key(&Platform::Youtube));
    assert_eq!(harness.video.concatenated.lock().unwrap()[0].len(), 2);

    let checkpoint = harness.checkpoint(&script).await;
    assert!(!checkpoint.is_stage_complete(Stage::Images));
    assert_eq!(
        checkpoint.outcome(Stage::Images),
        Some(&StageOutcome::failed("1 of 3 units failed"))
    );

    let (orchestrator, images, video) = harness.rerun_with(FakeImages::default());
    let second = orchestrator
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &options)
        .await
        .unwrap();

    assert!(second[0].success, "errors: {:?}", second[0].errors);
    assert_eq!(images.calls.load(Ordering::SeqCst), 1);
    assert_eq!(video.segment_calls.load(Ordering::SeqCst), 1);
    assert_eq!(video.concatenated.lock().unwrap()[0].len(), 3);
}

#[tokio::test]
async fn test_cancellation_saves_progress() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut harness = Harness::with_images(FakeImages {
        cancel_on_call: Some(shutdown_tx),
        ..FakeImages::default()
    });
    harness.config.max_concurrent_images = 1;
    let script = three_scene_script();
    let path = harness.save_script(&script).await;

    let results = harness
        .orchestrator()
        .with_shutdown(shutdown_rx)
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &script_options(path))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.status, JobStatus::Cancelled);
    assert!(!result.success);
    assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
    assert_eq!(harness.images.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.speech.calls.load(Ordering::SeqCst), 0);

    let checkpoint = harness.checkpoint(&script).await;
    assert_eq!(checkpoint.status, JobStatus::Cancelled);
    assert!(checkpoint.is_image_done(1));
    assert!(!checkpoint.is_image_done(2));
}

#[tokio::test]
async fn test_missing_scripts_are_scraped() {
    let harness = Harness::new();
    let items = vec![
        RawContent::new("Octopus Hearts", long_text("octopus"), ContentSourceType::Wikipedia, "https://example.org/a")
            .with_score(80.0),
        RawContent::new("Tiny Text", "too short", ContentSourceType::Wikipedia, "https://example.org/b")
            .with_score(90.0),
        RawContent::new("Mantis Shrimp Eyes", long_text("shrimp"), ContentSourceType::Wikipedia, "https://example.org/c")
            .with_score(70.0),
    ];
    let aggregator = ContentAggregator::new(AggregatorConfig::default())
        .with_source(Arc::new(FakeSource { items }));

    let results = harness
        .orchestrator()
        .with_aggregator(Arc::new(aggregator))
        .run(Niche::AnimalFacts, &[Platform::Tiktok], 3, &RunOptions::default())
        .await
        .unwrap();

    // Three requested, but only two items carry enough text.
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));

    let saved = ScriptStore::new()
        .load_existing(&harness.config.scripts_dir(Niche::AnimalFacts), 10)
        .await
        .unwrap();
    let titles: Vec<_> = saved.iter().map(|(_, s)| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Mantis Shrimp Eyes", "Octopus Hearts"]);
}

#[tokio::test]
async fn test_run_rejects_bad_input() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();

    let err = orchestrator
        .run(Niche::History, &[], 1, &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::InvalidInput(_)));

    let err = orchestrator
        .run(Niche::History, &[Platform::Youtube], 0, &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::InvalidInput(_)));
}

fn enhance_options(path: PathBuf) -> RunOptions {
    RunOptions {
        enhance: true,
        ..script_options(path)
    }
}

#[tokio::test]
async fn test_enhanced_script_is_saved_and_reused() {
    let harness = Harness::new();
    let script = three_scene_script();
    let path = harness.save_script(&script).await;
    let options = enhance_options(path);

    let enhancer = Arc::new(FakeEnhancer::default());
    let first = harness
        .orchestrator_with_enhancer(enhancer.clone())
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &options)
        .await
        .unwrap();
    assert!(first[0].success, "errors: {:?}", first[0].errors);
    assert_eq!(enhancer.calls.load(Ordering::SeqCst), 1);

    let store = ScriptStore::new();
    let scripts_dir = harness.config.scripts_dir(Niche::AnimalFacts);
    assert!(store.enhanced_path(&scripts_dir, &script).exists());
    let saved = store.load_enhanced(&scripts_dir, &script).await.unwrap();
    // Artifacts stay keyed by the original title.
    assert_eq!(saved.title, script.title);
    assert!(saved.scenes.iter().all(|s| s.narration.starts_with(ENHANCED_PREFIX)));

    let checkpoint = harness.checkpoint(&script).await;
    assert!(checkpoint.is_stage_complete(Stage::Enhance));
    assert_eq!(checkpoint.outcome(Stage::Enhance), Some(&StageOutcome::Completed));

    let second_enhancer = Arc::new(FakeEnhancer::default());
    let second = harness
        .orchestrator_with_enhancer(second_enhancer.clone())
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &options)
        .await
        .unwrap();
    assert!(second[0].success, "errors: {:?}", second[0].errors);
    assert_eq!(second_enhancer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(first[0].video_paths, second[0].video_paths);
}

#[tokio::test]
async fn test_enhancement_failure_is_only_a_warning() {
    let harness = Harness::new();
    let script = three_scene_script();
    let path = harness.save_script(&script).await;

    let enhancer = Arc::new(FakeEnhancer {
        fail: true,
        ..FakeEnhancer::default()
    });
    let results = harness
        .orchestrator_with_enhancer(enhancer.clone())
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &enhance_options(path))
        .await
        .unwrap();

    let result = &results[0];
    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result.errors.is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("enhance:"));
    assert!(result.warnings[0].contains("chat model unavailable"));
    assert_eq!(harness.images.calls.load(Ordering::SeqCst), 3);
    assert!(result.video_paths.contains_key(&Platform::Youtube));

    let scripts_dir = harness.config.scripts_dir(Niche::AnimalFacts);
    assert!(!ScriptStore::new().enhanced_path(&scripts_dir, &script).exists());
    let checkpoint = harness.checkpoint(&script).await;
    assert!(matches!(
        checkpoint.outcome(Stage::Enhance),
        Some(StageOutcome::Failed { .. })
    ));
}

#[tokio::test]
async fn test_enhance_runs_when_requested_after_a_skipped_run() {
    let harness = Harness::new();
    let script = three_scene_script();
    let path = harness.save_script(&script).await;

    let enhancer = Arc::new(FakeEnhancer::default());
    let first = harness
        .orchestrator_with_enhancer(enhancer.clone())
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &script_options(path.clone()))
        .await
        .unwrap();
    assert!(first[0].success);
    assert_eq!(enhancer.calls.load(Ordering::SeqCst), 0);

    let checkpoint = harness.checkpoint(&script).await;
    assert!(!checkpoint.is_stage_complete(Stage::Enhance));

    let second = harness
        .orchestrator_with_enhancer(enhancer.clone())
        .run(Niche::AnimalFacts, &[Platform::Youtube], 1, &enhance_options(path))
        .await
        .unwrap();
    assert!(second[0].success, "errors: {:?}", second[0].errors);
    assert_eq!(enhancer.calls.load(Ordering::SeqCst), 1);

    let checkpoint = harness.checkpoint(&script).await;
    assert_eq!(checkpoint.outcome(Stage::Enhance), Some(&StageOutcome::Completed));
}

#[tokio::test]
async fn test_background_music_is_mixed_into_final_video() {
    let harness = Harness::new();
    let script = three_scene_script();
    let path = harness.save_script(&script).await;
    let music = harness.config.output_dir.join("ambient.mp3");
    std::fs::write(&music, b"music").unwrap();

    let options = RunOptions {
        music: Some(music.clone()),
        ..script_options(path)
    };
    let results = harness
        .orchestrator()
        .run(Niche::AnimalFacts, &[Platform::Tiktok], 1, &options)
        .await
        .unwrap();
    assert!(results[0].success, "errors: {:?}", results[0].errors);

    let layout = harness.config.layout(&script);
    let mixes = harness.video.music_mixes.lock().unwrap().clone();
    assert_eq!(mixes, vec![(layout.concat_path(Platform::Tiktok), music)]);

    let final_video = &results[0].video_paths[&Platform::Tiktok];
    assert_eq!(std::fs::read(final_video).unwrap(), b"mixed");
}
