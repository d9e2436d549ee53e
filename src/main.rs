use anyhow::Result;
use clap::Parser;
use youtube_transcriptor::TranscriptorError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod audio;
mod captions;
mod cli;
mod config;
mod output;
mod pipeline;
mod transcribe;
mod transcript;
mod utils;
mod video;

use audio::{AudioDownloader, YtDlpAudioDownloader};
use cli::{Cli, Commands, OutputFormat};
use config::Config;
use pipeline::{ExtractionPipeline, ExtractionResult};
use transcribe::{Transcriber, WhisperApiTranscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "youtube_transcriptor=debug"
    } else {
        "youtube_transcriptor=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;

    // Check for required external dependencies (non-fatal)
    if !cli.quiet {
        let missing = utils::check_dependencies(&config.audio.yt_dlp_path).await;
        if !missing.is_empty() {
            eprintln!("⚠️  Dependency check warnings:");
            for dep in missing {
                eprintln!("   • {}", dep);
            }
            eprintln!("   (Continuing anyway - tools may be available)");
        }
    }

    match cli.command {
        Commands::Extract {
            url,
            prefer_captions,
            language,
            fallback_language,
            format,
            output,
            timestamps,
        } => {
            let mut config = config;
            if let Some(language) = language {
                config.captions.language = language;
            }
            if let Some(fallback) = fallback_language {
                config.captions.fallback_language = Some(fallback);
            }

            if let Some(domain) = utils::extract_domain(&url) {
                tracing::debug!("Source domain: {}", domain);
            }

            let pipeline = ExtractionPipeline::new(&config);
            tracing::info!("Starting caption extraction for: {}", url);
            let result = pipeline.extract_transcript(&url, prefer_captions).await?;

            if !result.success {
                eprintln!(
                    "No captions found; audio extraction is available via the `transcribe` subcommand."
                );
            }
            emit(&result, format, output, timestamps, &config).await?;
        }

        Commands::Transcribe {
            url,
            language,
            format,
            output,
            keep_audio,
            timestamps,
        } => {
            let mut config = config;
            if let Some(language) = language {
                config.captions.language = language;
            }

            let result = if video::extract_video_id(&url).is_some() {
                let pipeline = ExtractionPipeline::new(&config);
                tracing::info!("Starting transcript extraction for: {}", url);
                let caption_result = pipeline.extract_transcript(&url, true).await?;

                if caption_result.success {
                    caption_result
                } else {
                    tracing::info!("No captions found, falling back to audio transcription");
                    let segments = transcribe_from_audio(
                        &config,
                        &url,
                        keep_audio || config.app.keep_audio,
                    )
                    .await?;

                    let mut result = ExtractionResult::from_transcription(
                        segments,
                        config.captions.language.clone(),
                    );
                    // keep the caption-stage diagnostics visible in the final response
                    for (method, diagnostic) in caption_result.diagnostics {
                        result.diagnostics.entry(method).or_insert(diagnostic);
                    }
                    result
                }
            } else {
                // no video identifier: treat the input as a direct audio URL
                let audio_url = utils::validate_and_normalize_url(&url)?;
                tracing::info!("Transcribing remote audio directly: {}", audio_url);
                let transcriber = WhisperApiTranscriber::new(&config.transcription)?;
                let segments = transcriber
                    .transcribe_remote(&audio_url, Some(&config.captions.language))
                    .await?;
                ExtractionResult::from_transcription(segments, config.captions.language.clone())
            };

            emit(&result, format, output, timestamps, &config).await?;
        }

        Commands::Audio { url, output } => {
            let downloader = YtDlpAudioDownloader::new(&config.audio);
            if !downloader.check_availability().await? {
                anyhow::bail!(
                    "yt-dlp is not available. Please install it: https://github.com/yt-dlp/yt-dlp"
                );
            }
            let video_url = resolve_video_url(&url)?;

            let output_path = match output {
                Some(path) => path,
                None => std::env::current_dir()?
                    .join(utils::generate_unique_filename("audio", "mp3")),
            };

            downloader.download_audio(&video_url, &output_path).await?;
            println!("Audio saved to: {}", output_path.display());
        }

        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.interactive_setup().await?;
            }
        }

        Commands::Methods => {
            println!("Caption methods, in order:");
            for method in &config.captions.methods {
                let description = match method {
                    captions::CaptionMethod::Timedtext => "direct timed-text endpoint lookup",
                    captions::CaptionMethod::YoutubeApi => "player metadata caption tracks",
                    captions::CaptionMethod::YtDlpSubtitles => "yt-dlp subtitle download",
                };
                println!("  • {} - {}", method, description);
            }
            println!("\nWhen every method finds nothing, `transcribe` extracts the audio and");
            println!("sends it to the configured transcription API.");
        }
    }

    Ok(())
}

/// Canonicalize a URL or bare video id into something yt-dlp accepts.
fn resolve_video_url(url: &str) -> Result<String> {
    match video::extract_video_id(url) {
        Some(id) => Ok(format!("https://www.youtube.com/watch?v={}", id)),
        None => utils::validate_and_normalize_url(url),
    }
}

/// Download the audio track and run it through the transcription bridge.
async fn transcribe_from_audio(
    config: &Config,
    url: &str,
    keep_audio: bool,
) -> Result<Vec<transcript::TranscriptSegment>> {
    let video_url = resolve_video_url(url)?;

    let downloader = YtDlpAudioDownloader::new(&config.audio);
    if !downloader.check_availability().await? {
        anyhow::bail!(
            "yt-dlp is not available. Please install it: https://github.com/yt-dlp/yt-dlp"
        );
    }
    let temp_dir = tempfile::TempDir::new()?;
    let work_dir = match &config.app.temp_dir {
        Some(dir) => {
            fs_err::create_dir_all(dir)?;
            dir.clone()
        }
        None => temp_dir.path().to_path_buf(),
    };
    let audio_path = work_dir.join(utils::generate_unique_filename("audio", "mp3"));

    downloader.download_audio(&video_url, &audio_path).await?;

    let transcriber = WhisperApiTranscriber::new(&config.transcription)?;
    let segments = transcriber
        .transcribe_file(&audio_path, Some(&config.captions.language))
        .await?;

    if keep_audio {
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "audio.mp3".into());
        let destination = std::env::current_dir()?.join(file_name);
        fs_err::copy(&audio_path, &destination)?;
        println!("Audio saved to: {}", destination.display());
    }

    Ok(segments)
}

/// Write the result to the requested destination in the requested format.
async fn emit(
    result: &ExtractionResult,
    format: Option<OutputFormat>,
    output: Option<PathBuf>,
    timestamps: bool,
    config: &Config,
) -> Result<()> {
    let format =
        format.unwrap_or_else(|| OutputFormat::from_name(&config.app.default_output_format));
    match output {
        Some(path) => {
            output::save_to_file(result, &path, &format, timestamps).await?;
            println!("Transcript saved to: {}", path.display());
        }
        None => {
            output::print_to_console(result, &format, timestamps)?;
        }
    }
    Ok(())
}
