use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stickgen::api::{ImageGenerator, TextGenerator, VoiceSynthesizer};
use stickgen::timeline::Frame;
use stickgen::{
    Pipeline, PipelineConfig, ProgressSender, RateLimiter, Result, Stage, VideoEncoder, VideoError,
};

#[derive(Default)]
struct FakeTextGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for FakeTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Echo the prompt so the script line stays traceable through the
        // image stage and into the encoded frames.
        Ok(format!("description of {prompt}"))
    }
}

#[derive(Default)]
struct FakeImageGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl ImageGenerator for FakeImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(prompt.as_bytes().to_vec())
    }
}

#[derive(Default)]
struct FakeVoice {
    calls: AtomicUsize,
}

#[async_trait]
impl VoiceSynthesizer for FakeVoice {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(b"fake-mp3".to_vec())
    }
}

struct FailingVoice;

#[async_trait]
impl VoiceSynthesizer for FailingVoice {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        Err(VideoError::external("narration", "voice service unavailable"))
    }
}

/// Captures the frames it is asked to encode (path, duration, and the frame
/// file's contents as they existed at encode time) and writes a stub output.
struct FakeEncoder {
    audio_duration: f64,
    encode_calls: AtomicUsize,
    captured: Mutex<Vec<(PathBuf, f64, Vec<u8>)>>,
}

impl FakeEncoder {
    fn new(audio_duration: f64) -> Self {
        Self {
            audio_duration,
            encode_calls: AtomicUsize::new(0),
            captured: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VideoEncoder for FakeEncoder {
    async fn encode(&self, frames: &[Frame], audio_path: &Path, output_path: &Path) -> Result<()> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        assert!(audio_path.exists(), "audio must exist at encode time");

        {
            let mut captured = self.captured.lock().unwrap();
            for frame in frames {
                let bytes = std::fs::read(&frame.image_path).expect("frame image must exist");
                captured.push((frame.image_path.clone(), frame.duration, bytes));
            }
        }

        tokio::fs::write(output_path, b"fake-video").await?;
        Ok(())
    }

    async fn audio_duration(&self, audio_path: &Path) -> Result<f64> {
        assert!(audio_path.exists(), "audio must exist before probing");
        Ok(self.audio_duration)
    }
}

struct Harness {
    text: Arc<FakeTextGenerator>,
    image: Arc<FakeImageGenerator>,
    voice: Arc<FakeVoice>,
    encoder: Arc<FakeEncoder>,
    pipeline: Pipeline,
    assets_dir: PathBuf,
    temp_root: PathBuf,
    _root: tempfile::TempDir,
}

fn harness(audio_duration: f64) -> Harness {
    let root = tempfile::tempdir().unwrap();
    let assets_dir = root.path().join("generated");
    let temp_root = root.path().join("temp");

    let text = Arc::new(FakeTextGenerator::default());
    let image = Arc::new(FakeImageGenerator::default());
    let voice = Arc::new(FakeVoice::default());
    let encoder = Arc::new(FakeEncoder::new(audio_duration));

    let pipeline = Pipeline::new(
        text.clone(),
        image.clone(),
        voice.clone(),
        encoder.clone(),
        Arc::new(RateLimiter::with_interval(Duration::ZERO)),
        PipelineConfig {
            assets_dir: assets_dir.clone(),
            temp_root: temp_root.clone(),
            public_url_prefix: "/generated".to_string(),
        },
    );

    Harness {
        text,
        image,
        voice,
        encoder,
        pipeline,
        assets_dir,
        temp_root,
        _root: root,
    }
}

fn assert_no_temp_leftovers(temp_root: &Path) {
    if temp_root.exists() {
        let leftovers: Vec<_> = std::fs::read_dir(temp_root)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert!(leftovers.is_empty(), "temporary files remain: {leftovers:?}");
    }
}

#[tokio::test]
async fn two_line_script_end_to_end() {
    let h = harness(10.0);

    let result = h
        .pipeline
        .generate("Alice waves.\nBob jumps.", &ProgressSender::disabled())
        .await
        .unwrap();

    assert_eq!(result.duration, 10.0);
    assert!(result.video_url.starts_with("/generated/video_"));
    assert!(result.video_url.ends_with(".mp4"));

    // The durable artifact exists; nothing temporary survives.
    let output = h.assets_dir.join(result.video_url.rsplit('/').next().unwrap());
    assert!(output.exists());
    assert_no_temp_leftovers(&h.temp_root);

    // Two frames, each holding exactly half the narration, in script order.
    let captured = h.encoder.captured.lock().unwrap();
    assert_eq!(captured.len(), 2);
    for (_, duration, _) in captured.iter() {
        assert_eq!(*duration, 5.0);
    }
    let first = String::from_utf8(captured[0].2.clone()).unwrap();
    let second = String::from_utf8(captured[1].2.clone()).unwrap();
    assert!(first.contains("Alice waves."));
    assert!(second.contains("Bob jumps."));

    assert_eq!(h.text.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.image.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.voice.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.encoder.encode_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn frame_count_matches_non_blank_lines() {
    let h = harness(9.0);

    h.pipeline
        .generate("  one  \n\n two \n   \nthree\n", &ProgressSender::disabled())
        .await
        .unwrap();

    let captured = h.encoder.captured.lock().unwrap();
    assert_eq!(captured.len(), 3);
    let sum: f64 = captured.iter().map(|(_, duration, _)| duration).sum();
    assert!((sum - 9.0).abs() < 1e-9);
}

#[tokio::test]
async fn progress_covers_stages_in_order() {
    let h = harness(10.0);
    let (progress, mut rx) = ProgressSender::channel();

    h.pipeline
        .generate("Alice waves.\nBob jumps.", &progress)
        .await
        .unwrap();
    drop(progress);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let stages: Vec<Stage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::Images,
            Stage::Images,
            Stage::Images,
            Stage::Audio,
            Stage::Audio,
            Stage::Video,
            Stage::Video,
            Stage::Complete,
        ]
    );

    // Non-decreasing progress within each stage, bounded to [0, 100].
    for pair in events.windows(2) {
        if pair[0].stage == pair[1].stage {
            assert!(pair[1].progress >= pair[0].progress);
        }
    }
    for event in &events {
        assert!((0.0..=100.0).contains(&event.progress));
    }

    // Per-line image progress: 0 -> 50 -> 100.
    assert_eq!(events[0].progress, 0.0);
    assert_eq!(events[1].progress, 50.0);
    assert_eq!(events[2].progress, 100.0);
}

#[tokio::test]
async fn failure_still_cleans_up_and_propagates() {
    let root = tempfile::tempdir().unwrap();
    let assets_dir = root.path().join("generated");
    let temp_root = root.path().join("temp");

    let pipeline = Pipeline::new(
        Arc::new(FakeTextGenerator::default()),
        Arc::new(FakeImageGenerator::default()),
        Arc::new(FailingVoice),
        Arc::new(FakeEncoder::new(10.0)),
        Arc::new(RateLimiter::with_interval(Duration::ZERO)),
        PipelineConfig {
            assets_dir: assets_dir.clone(),
            temp_root: temp_root.clone(),
            public_url_prefix: "/generated".to_string(),
        },
    );

    let err = pipeline
        .generate("Alice waves.\nBob jumps.", &ProgressSender::disabled())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        VideoError::ExternalService { stage: "narration", .. }
    ));
    assert_no_temp_leftovers(&temp_root);
    // No durable artifact for a failed run.
    assert!(std::fs::read_dir(&assets_dir).unwrap().next().is_none());
}

#[tokio::test]
async fn non_positive_audio_duration_fails_the_run() {
    for bad_duration in [0.0, -1.0, f64::NAN] {
        let h = harness(bad_duration);

        let err = h
            .pipeline
            .generate("Alice waves.", &ProgressSender::disabled())
            .await
            .unwrap_err();

        assert!(
            matches!(err, VideoError::ExternalService { stage: "narration", .. }),
            "duration {bad_duration}: unexpected error {err}"
        );
        // Assembly never ran, and the failed run left nothing behind.
        assert_eq!(h.encoder.encode_calls.load(Ordering::SeqCst), 0);
        assert_no_temp_leftovers(&h.temp_root);
    }
}

#[tokio::test]
async fn concurrent_runs_get_distinct_artifacts() {
    let h = harness(10.0);

    let first_progress = ProgressSender::disabled();
    let second_progress = ProgressSender::disabled();
    let (first, second) = tokio::join!(
        h.pipeline.generate("Alice waves.", &first_progress),
        h.pipeline.generate("Bob jumps.", &second_progress),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_ne!(first.video_url, second.video_url);
    for result in [&first, &second] {
        let name = result.video_url.rsplit('/').next().unwrap();
        assert!(h.assets_dir.join(name).exists());
    }
    assert_no_temp_leftovers(&h.temp_root);
}

#[tokio::test]
async fn empty_script_fails_before_any_side_effect() {
    let h = harness(10.0);

    let err = h
        .pipeline
        .generate("   \n\n", &ProgressSender::disabled())
        .await
        .unwrap_err();

    assert!(matches!(err, VideoError::EmptyScript));
    assert_eq!(h.text.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.image.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.voice.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.encoder.encode_calls.load(Ordering::SeqCst), 0);
    assert!(!h.temp_root.exists());
    assert!(!h.assets_dir.exists());
}
