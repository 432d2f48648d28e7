//! Turns a multi-line text script into a narrated stickman animation video.
//!
//! The pipeline obtains a visual description per script line, renders a
//! still per description, synthesizes one narration track, spreads its
//! duration evenly across the frames, and assembles everything into a
//! single video with ffmpeg. Calls to the quota-limited services are spaced
//! through a shared [`limiter::RateLimiter`], and every run's intermediate
//! files are deleted no matter how the run ends.

pub mod api;
pub mod error;
pub mod limiter;
pub mod pipeline;
pub mod progress;
pub mod script;
pub mod timeline;
pub mod video;

pub use error::{Result, VideoError};
pub use limiter::{RateLimiter, ServiceClass, MIN_INTERVAL};
pub use pipeline::{GenerationResult, Pipeline, PipelineConfig};
pub use progress::{GenerationProgress, ProgressSender, Stage};
pub use timeline::{Frame, NarrationAudio};
pub use video::{FfmpegEncoder, VideoEncoder};
