use std::time::Duration;

use thiserror::Error;

use crate::limiter::ServiceClass;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("script contains no usable lines")]
    EmptyScript,

    /// The external service reported an exceeded quota. `retry_after` is the
    /// interval the service advertised, when it advertised one; `None` means
    /// the quota will not recover soon and the caller should not retry now.
    #[error("{service} service quota exceeded: {message}")]
    QuotaExceeded {
        service: ServiceClass,
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("{stage} stage failed: {message}")]
    ExternalService { stage: &'static str, message: String },

    #[error("ffmpeg error: {0}")]
    Ffmpeg(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VideoError {
    pub fn external(stage: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalService {
            stage,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VideoError>;
