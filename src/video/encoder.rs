use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::{Result, VideoError};
use crate::timeline::Frame;

use super::VideoEncoder;

/// Encoder shelling out to ffmpeg/ffprobe on PATH. Each frame becomes a
/// looped-still segment of its duration; segments are concatenated with
/// stream copy and the narration track is muxed in last.
pub struct FfmpegEncoder;

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self
    }

    async fn create_segment(
        &self,
        image_path: &Path,
        duration: f64,
        output_path: &Path,
    ) -> Result<()> {
        let output = Command::new("ffmpeg")
            .args([
                "-y",
                "-loop",
                "1",
                "-i",
            ])
            .arg(image_path)
            .args([
                "-t",
                &duration.to_string(),
                "-pix_fmt",
                "yuv420p",
                "-r",
                "30",
                "-c:v",
                "libx264",
            ])
            .arg(output_path)
            .output()
            .await
            .map_err(|e| VideoError::Ffmpeg(format!("Failed to run ffmpeg: {e}")))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::Ffmpeg(format!(
                "segment creation failed: {error}"
            )));
        }
        Ok(())
    }

    async fn concat_segments(&self, concat_file: &Path, output_path: &Path) -> Result<()> {
        let output = Command::new("ffmpeg")
            .args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(concat_file)
            .args(["-c", "copy"])
            .arg(output_path)
            .output()
            .await
            .map_err(|e| VideoError::Ffmpeg(format!("Failed to run ffmpeg: {e}")))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::Ffmpeg(format!("concat failed: {error}")));
        }
        Ok(())
    }

    async fn mux_audio(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        let output = Command::new("ffmpeg")
            .args(["-y", "-i"])
            .arg(video_path)
            .arg("-i")
            .arg(audio_path)
            .args([
                "-c:v", "copy", "-c:a", "aac", "-map", "0:v:0", "-map", "1:a:0", "-shortest",
            ])
            .arg(output_path)
            .output()
            .await
            .map_err(|e| VideoError::Ffmpeg(format!("Failed to run ffmpeg: {e}")))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::Ffmpeg(format!("audio mux failed: {error}")));
        }
        Ok(())
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn encode(&self, frames: &[Frame], audio_path: &Path, output_path: &Path) -> Result<()> {
        info!("Assembling video from {} frames...", frames.len());

        // Intermediates live next to the frames, inside the run's temp dir,
        // so the pipeline's cleanup also covers them if encoding fails.
        let scratch_dir = frames
            .first()
            .and_then(|frame| frame.image_path.parent())
            .ok_or_else(|| VideoError::Ffmpeg("no frames to encode".to_string()))?
            .to_path_buf();

        let mut concat_content = String::new();
        let mut segment_paths: Vec<PathBuf> = Vec::with_capacity(frames.len());

        for (index, frame) in frames.iter().enumerate() {
            let segment_path = scratch_dir.join(format!("segment_{index}.mp4"));
            self.create_segment(&frame.image_path, frame.duration, &segment_path)
                .await?;

            let abs_segment = segment_path.canonicalize().map_err(|e| {
                VideoError::Ffmpeg(format!("Failed to get absolute segment path: {e}"))
            })?;
            concat_content.push_str(&format!("file '{}'\n", abs_segment.display()));
            segment_paths.push(segment_path);
        }

        let concat_file = scratch_dir.join("concat.txt");
        tokio::fs::write(&concat_file, concat_content).await?;

        let merged_video = scratch_dir.join("merged.mp4");
        self.concat_segments(&concat_file, &merged_video).await?;
        self.mux_audio(&merged_video, audio_path, output_path).await?;

        info!("Video assembled: {}", output_path.display());

        tokio::fs::remove_file(&concat_file).await.ok();
        tokio::fs::remove_file(&merged_video).await.ok();
        for segment in segment_paths {
            tokio::fs::remove_file(&segment).await.ok();
        }

        Ok(())
    }

    async fn audio_duration(&self, audio_path: &Path) -> Result<f64> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(audio_path)
            .output()
            .await
            .map_err(|e| VideoError::Ffmpeg(format!("Failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::Ffmpeg(format!("ffprobe failed: {error}")));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<f64>()
            .map_err(|e| VideoError::Ffmpeg(format!("unparseable ffprobe duration: {e}")))
    }
}
