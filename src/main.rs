use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use stickgen::api::{ElevenLabsClient, GeminiClient};
use stickgen::{FfmpegEncoder, Pipeline, PipelineConfig, ProgressSender, RateLimiter};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "stickgen")]
#[command(about = "Generate a narrated stickman animation video from a text script", long_about = None)]
struct Args {
    /// Script text, one scene per line
    #[arg(short, long)]
    text: Option<String>,

    /// Script file path
    #[arg(short, long)]
    file: Option<String>,

    /// Directory for finished videos
    #[arg(short, long, default_value = "public/generated")]
    output_dir: PathBuf,

    /// Root for per-run temporary files
    #[arg(short = 'w', long, default_value = "temp_video")]
    temp_dir: PathBuf,

    /// Google AI API key (defaults to GOOGLE_AI_API_KEY)
    #[arg(long)]
    google_api_key: Option<String>,

    /// ElevenLabs API key (defaults to ELEVENLABS_API_KEY)
    #[arg(long)]
    elevenlabs_api_key: Option<String>,

    /// ElevenLabs voice id
    #[arg(long)]
    voice_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let google_api_key = match args.google_api_key.or_else(|| std::env::var("GOOGLE_AI_API_KEY").ok()) {
        Some(key) => key,
        None => {
            eprintln!("Error: GOOGLE_AI_API_KEY not found. Set it via --google-api-key or the GOOGLE_AI_API_KEY environment variable");
            std::process::exit(1);
        }
    };
    let elevenlabs_api_key = match args
        .elevenlabs_api_key
        .or_else(|| std::env::var("ELEVENLABS_API_KEY").ok())
    {
        Some(key) => key,
        None => {
            eprintln!("Error: ELEVENLABS_API_KEY not found. Set it via --elevenlabs-api-key or the ELEVENLABS_API_KEY environment variable");
            std::process::exit(1);
        }
    };

    let script = if let Some(text) = args.text {
        text
    } else if let Some(file_path) = args.file {
        tokio::fs::read_to_string(&file_path)
            .await
            .context(format!("Failed to read file: {file_path}"))?
    } else {
        eprintln!("Error: Either --text or --file must be provided");
        std::process::exit(1);
    };

    info!("Starting stickman video generation...");
    info!("Script length: {} characters", script.len());

    let gemini = Arc::new(GeminiClient::new(google_api_key));
    let voice = Arc::new(match args.voice_id {
        Some(voice_id) => ElevenLabsClient::with_voice(elevenlabs_api_key, voice_id),
        None => ElevenLabsClient::new(elevenlabs_api_key),
    });

    let pipeline = Pipeline::new(
        gemini.clone(),
        gemini,
        voice,
        Arc::new(FfmpegEncoder::new()),
        Arc::new(RateLimiter::new()),
        PipelineConfig {
            assets_dir: args.output_dir,
            temp_root: args.temp_dir,
            ..PipelineConfig::default()
        },
    );

    let (progress, mut events) = ProgressSender::channel();
    let reporter = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!("[{:?}] {:.0}% - {}", event.stage, event.progress, event.message);
        }
    });

    let result = pipeline.generate(&script, &progress).await;
    drop(progress);
    reporter.await.ok();

    match result {
        Ok(result) => {
            info!(
                "Video generation completed: {} ({:.1}s)",
                result.video_url, result.duration
            );
            Ok(())
        }
        Err(e) => {
            error!("Video generation failed: {}", e);
            std::process::exit(1);
        }
    }
}
