use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;

pub mod elevenlabs;
pub mod gemini;

pub use elevenlabs::ElevenLabsClient;
pub use gemini::GeminiClient;

/// Produces a short visual description for one script line.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Renders a still image for a prompt, returning encoded image bytes. The
/// pipeline owns the temporary path the bytes are written to.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// Synthesizes speech for the full narration, returning encoded audio bytes.
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Matches the two ways the services advertise a retry interval:
/// a "retry in 12.5s" hint in the message, or a structured
/// `"retryDelay": "12s"` detail in the error payload.
static RETRY_AFTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"retry(?: in |Delay"\s*:\s*")([0-9]+(?:\.[0-9]+)?)s"#).unwrap());

/// Extracts an advertised retry interval from an error payload, if present.
pub(crate) fn parse_retry_after(body: &str) -> Option<Duration> {
    let captures = RETRY_AFTER.captures(body)?;
    let seconds: f64 = captures[1].parse().ok()?;
    Some(Duration::from_secs_f64(seconds))
}

/// True when an error payload signals an exceeded quota rather than a
/// generic failure.
pub(crate) fn is_quota_signal(status: reqwest::StatusCode, body: &str) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || body.contains("RESOURCE_EXHAUSTED")
        || body.contains("Quota exceeded")
}
