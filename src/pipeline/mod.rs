use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{info, warn};

use crate::api::{ImageGenerator, TextGenerator, VoiceSynthesizer};
use crate::error::{Result, VideoError};
use crate::limiter::RateLimiter;
use crate::progress::{ProgressSender, Stage};
use crate::script::normalize_script;
use crate::timeline::{build_frames, NarrationAudio};
use crate::video::VideoEncoder;

mod stages;

use stages::{describe_line, render_frame_image, synthesize_narration};

/// Where a run keeps its temporary files and where the final video lands.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Durable output directory for finished videos.
    pub assets_dir: PathBuf,
    /// Per-run temporary directories are created beneath this root.
    pub temp_root: PathBuf,
    /// URL prefix under which `assets_dir` is served.
    pub public_url_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("public/generated"),
            temp_root: PathBuf::from("temp_video"),
            public_url_prefix: "/generated".to_string(),
        }
    }
}

/// Terminal success value for one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub video_url: String,
    pub duration: f64,
}

/// The generation pipeline: sequences description, image, narration and
/// assembly for one script, spacing external calls through the shared rate
/// limiter and cleaning up intermediates on every exit path.
pub struct Pipeline {
    text_generator: Arc<dyn TextGenerator>,
    image_generator: Arc<dyn ImageGenerator>,
    voice: Arc<dyn VoiceSynthesizer>,
    encoder: Arc<dyn VideoEncoder>,
    limiter: Arc<RateLimiter>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        text_generator: Arc<dyn TextGenerator>,
        image_generator: Arc<dyn ImageGenerator>,
        voice: Arc<dyn VoiceSynthesizer>,
        encoder: Arc<dyn VideoEncoder>,
        limiter: Arc<RateLimiter>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            text_generator,
            image_generator,
            voice,
            encoder,
            limiter,
            config,
        }
    }

    /// Runs the whole pipeline for one script. Emits progress into
    /// `progress` and returns exactly one terminal outcome. The run's
    /// temporary directory is removed whether the run succeeds or fails;
    /// only the final video under `assets_dir` persists.
    pub async fn generate(
        &self,
        script: &str,
        progress: &ProgressSender,
    ) -> Result<GenerationResult> {
        // Entry guard: no side effects for an unusable script.
        let lines = normalize_script(script)?;

        let run_id = next_run_id();
        let temp_dir = self.config.temp_root.join(format!("run_{run_id}"));
        tokio::fs::create_dir_all(&self.config.assets_dir).await?;
        tokio::fs::create_dir_all(&temp_dir).await?;

        let result = self.run(&lines, &temp_dir, &run_id, progress).await;

        // Unconditional teardown. Failures here are logged and swallowed so
        // they can never mask the run's outcome.
        cleanup_temp_dir(&temp_dir).await;

        result
    }

    async fn run(
        &self,
        lines: &[String],
        temp_dir: &Path,
        run_id: &str,
        progress: &ProgressSender,
    ) -> Result<GenerationResult> {
        let total = lines.len();

        // Stage 1: one description + one image per line, strictly in order.
        progress.emit(Stage::Images, 0.0, "Generating stickman images...");
        let mut image_paths = Vec::with_capacity(total);
        for (index, line) in lines.iter().enumerate() {
            let description =
                describe_line(self.text_generator.as_ref(), &self.limiter, line).await?;
            info!("Scene {}: {}", index + 1, description);

            let image_path = temp_dir.join(format!("frame_{index}.png"));
            render_frame_image(
                self.image_generator.as_ref(),
                &self.limiter,
                &description,
                &image_path,
            )
            .await?;
            image_paths.push(image_path);

            progress.emit(
                Stage::Images,
                ((index + 1) as f64 / total as f64) * 100.0,
                format!("Generated image {} of {}", index + 1, total),
            );
        }

        // Stage 2: single narration pass over the full script.
        progress.emit(Stage::Audio, 0.0, "Converting script to speech...");
        let audio_path = temp_dir.join("audio.mp3");
        synthesize_narration(self.voice.as_ref(), lines, &audio_path).await?;
        progress.emit(Stage::Audio, 100.0, "Audio generated successfully");

        let total_duration = self.encoder.audio_duration(&audio_path).await?;
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Err(VideoError::external(
                "narration",
                format!("audio duration probe returned {total_duration}"),
            ));
        }
        let narration = NarrationAudio {
            audio_path,
            total_duration,
        };

        // Stage 3: even timeline, then assembly.
        progress.emit(Stage::Video, 0.0, "Stitching video together...");
        let frames = build_frames(image_paths, narration.total_duration);
        let output_name = format!("video_{run_id}.mp4");
        let output_path = self.config.assets_dir.join(&output_name);
        self.encoder
            .encode(&frames, &narration.audio_path, &output_path)
            .await?;
        progress.emit(Stage::Video, 100.0, "Video created successfully");

        progress.emit(Stage::Complete, 100.0, "Video generation complete!");
        Ok(GenerationResult {
            video_url: format!("{}/{output_name}", self.config.public_url_prefix),
            duration: narration.total_duration,
        })
    }
}

/// Distinguishes runs that start within the same millisecond.
static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_run_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = RUN_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{millis}_{seq}")
}

async fn cleanup_temp_dir(temp_dir: &Path) {
    if let Err(err) = tokio::fs::remove_dir_all(temp_dir).await {
        if err.kind() != ErrorKind::NotFound {
            warn!(
                dir = %temp_dir.display(),
                error = %err,
                "failed to remove temporary files"
            );
        }
    }
}
