use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::timeline::Frame;

pub mod encoder;

pub use encoder::FfmpegEncoder;

/// External media-encoding capability: muxes ordered frames with the
/// narration audio, and probes audio duration for the timeline.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Produces one muxed video at `output_path` whose video track switches
    /// source image at each frame boundary, in frame order.
    async fn encode(&self, frames: &[Frame], audio_path: &Path, output_path: &Path) -> Result<()>;

    /// Total duration of an audio file, in seconds.
    async fn audio_duration(&self, audio_path: &Path) -> Result<f64>;
}
