use std::future::Future;
use std::path::Path;

use tracing::{info, warn};

use crate::api::{ImageGenerator, TextGenerator, VoiceSynthesizer};
use crate::error::{Result, VideoError};
use crate::limiter::{RateLimiter, ServiceClass};
use crate::script::narration_text;

/// Runs one rate-limited external call under the uniform quota policy:
/// acquire the limiter, invoke, and on a quota error that advertises a
/// retry interval, wait it out, re-acquire, and retry exactly once. A quota
/// error without an interval (daily cap) propagates immediately, as does
/// the retry's own failure. Never more than one retry per call.
pub(crate) async fn with_quota_retry<T, F, Fut>(
    limiter: &RateLimiter,
    class: ServiceClass,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    limiter.acquire(class).await;
    match call().await {
        Err(VideoError::QuotaExceeded {
            service,
            retry_after: Some(wait),
            message,
        }) => {
            warn!(
                service = %service,
                wait_secs = wait.as_secs_f64(),
                message = %message,
                "quota exceeded, retrying once after advertised delay"
            );
            tokio::time::sleep(wait).await;
            limiter.acquire(class).await;
            call().await
        }
        result => result,
    }
}

/// Obtains the visual description for one script line.
pub(crate) async fn describe_line(
    text_generator: &dyn TextGenerator,
    limiter: &RateLimiter,
    line: &str,
) -> Result<String> {
    let prompt = format!(
        "Convert this script line into a detailed visual description for a stickman \
         animation scene:\n\"{line}\"\n\nRespond with only a concise visual description \
         (1-2 sentences) that describes what the stickman should be doing in this scene. \
         Focus on action, pose, and simple props if needed."
    );

    let description =
        with_quota_retry(limiter, ServiceClass::Description, || {
            text_generator.generate(&prompt)
        })
        .await?;

    let description = description.trim().to_string();
    if description.is_empty() {
        return Err(VideoError::external(
            "description",
            "text generator returned an empty description",
        ));
    }
    Ok(description)
}

/// Renders the still for one description and writes it to `image_path`.
pub(crate) async fn render_frame_image(
    image_generator: &dyn ImageGenerator,
    limiter: &RateLimiter,
    description: &str,
    image_path: &Path,
) -> Result<()> {
    let bytes = with_quota_retry(limiter, ServiceClass::Image, || {
        image_generator.generate(description)
    })
    .await?;

    if bytes.is_empty() {
        return Err(VideoError::external(
            "image",
            "image generator returned no data",
        ));
    }

    tokio::fs::write(image_path, bytes).await?;
    Ok(())
}

/// Joins the script into one narration string, synthesizes it in a single
/// call, and persists the audio. Any failure here is permanent for the run.
pub(crate) async fn synthesize_narration(
    voice: &dyn VoiceSynthesizer,
    lines: &[String],
    audio_path: &Path,
) -> Result<()> {
    let narration = narration_text(lines);
    info!("Synthesizing narration for {} script lines", lines.len());

    let audio = voice.synthesize(&narration).await?;
    tokio::fs::write(audio_path, audio).await?;
    Ok(())
}
