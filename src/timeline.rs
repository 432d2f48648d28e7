use std::path::PathBuf;

/// One generated still plus its on-screen duration in the final video.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub image_path: PathBuf,
    pub duration: f64,
}

/// The single narration track for a run.
#[derive(Debug, Clone)]
pub struct NarrationAudio {
    pub audio_path: PathBuf,
    pub total_duration: f64,
}

/// Even split of the narration across all frames. Kept as the exact quotient
/// (no per-frame rounding) so the durations sum back to the total.
pub fn frame_duration(total_duration: f64, frame_count: usize) -> f64 {
    debug_assert!(frame_count >= 1, "frame count is at least one for any normalized script");
    total_duration / frame_count as f64
}

/// Pairs the ordered frame images with their shared duration.
pub fn build_frames(image_paths: Vec<PathBuf>, total_duration: f64) -> Vec<Frame> {
    let duration = frame_duration(total_duration, image_paths.len());
    image_paths
        .into_iter()
        .map(|image_path| Frame {
            image_path,
            duration,
        })
        .collect()
}
