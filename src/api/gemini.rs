use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{Result, VideoError};
use crate::limiter::ServiceClass;

use super::{is_quota_signal, parse_retry_after, ImageGenerator, TextGenerator};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const TEXT_MODEL: &str = "gemini-2.0-flash-exp";
const IMAGE_MODEL: &str = "gemini-2.0-flash-exp-image-generation";

/// Client for the Google Generative Language API, covering both the scene
/// description model and the image generation model.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self { api_key, client }
    }

    async fn generate_content(
        &self,
        model: &str,
        body: serde_json::Value,
        service: ServiceClass,
        stage: &'static str,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{GEMINI_API_BASE}/{model}:generateContent");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(classify_failure(service, stage, status, error_text));
        }

        Ok(response.json().await?)
    }
}

/// Quota signals become `QuotaExceeded` with the advertised retry interval
/// when one is present; everything else is a permanent stage failure.
fn classify_failure(
    service: ServiceClass,
    stage: &'static str,
    status: StatusCode,
    body: String,
) -> VideoError {
    if is_quota_signal(status, &body) {
        VideoError::QuotaExceeded {
            service,
            retry_after: parse_retry_after(&body),
            message: body,
        }
    } else {
        VideoError::external(stage, format!("Gemini API error (HTTP {status}): {body}"))
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ]
        });

        let response = self
            .generate_content(TEXT_MODEL, body, ServiceClass::Description, "description")
            .await?;

        let text = response
            .candidates
            .and_then(|mut candidates| candidates.drain(..).next())
            .and_then(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .find_map(|part| part.text)
            })
            .ok_or_else(|| {
                VideoError::external("description", "Gemini API returned no text candidate")
            })?;

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        info!("Generating image for prompt: {}", prompt);

        let body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"]
            }
        });

        let response = self
            .generate_content(IMAGE_MODEL, body, ServiceClass::Image, "image")
            .await?;

        let encoded = response
            .candidates
            .and_then(|mut candidates| candidates.drain(..).next())
            .and_then(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .find_map(|part| part.inline_data)
            })
            .ok_or_else(|| VideoError::external("image", "Gemini API returned no image data"))?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded.data.as_bytes())
            .map_err(|e| VideoError::external("image", format!("invalid image payload: {e}")))
    }
}
