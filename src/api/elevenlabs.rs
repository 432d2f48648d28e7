use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::error::{Result, VideoError};

use super::VoiceSynthesizer;

const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const TTS_MODEL: &str = "eleven_multilingual_v2";

/// Client for the ElevenLabs text-to-speech API.
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    api_key: String,
    voice_id: String,
    client: Client,
}

impl ElevenLabsClient {
    pub fn new(api_key: String) -> Self {
        Self::with_voice(api_key, DEFAULT_VOICE_ID.to_string())
    }

    pub fn with_voice(api_key: String, voice_id: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key,
            voice_id,
            client,
        }
    }
}

#[async_trait]
impl VoiceSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        info!("Synthesizing narration ({} characters)...", text.len());

        let body = json!({
            "text": text,
            "model_id": TTS_MODEL,
        });

        let response = self
            .client
            .post(format!("{ELEVENLABS_API_BASE}/{}", self.voice_id))
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(VideoError::external(
                "narration",
                format!("ElevenLabs API error (HTTP {status}): {error_text}"),
            ));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(VideoError::external(
                "narration",
                "ElevenLabs API returned empty audio",
            ));
        }
        Ok(audio.to_vec())
    }
}
