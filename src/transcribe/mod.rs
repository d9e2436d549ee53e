use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

use crate::config::TranscriptionConfig;
use crate::transcript::{assemble, TranscriptSegment};
use crate::utils::{check_file_accessible, generate_unique_filename};
use crate::{Result, TranscriptorError};

/// Capability trait for speech-to-text, so the CLI flow can be composed
/// without a live API.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a local audio file into normalized segments.
    async fn transcribe_file(
        &self,
        audio_path: &Path,
        language: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>>;
}

/// Whisper-style transcription API response: a segment list, or a flat text
/// field when the API elides timing.
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: Option<String>,
    segments: Option<Vec<WhisperSegment>>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Bridge to a whisper-style transcription API.
pub struct WhisperApiTranscriber {
    client: Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl WhisperApiTranscriber {
    /// Build from config; the API key comes from the configured environment
    /// variable and is required.
    pub fn new(config: &TranscriptionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            TranscriptorError::ConfigurationError(format!(
                "transcription API key environment variable {} is not set",
                config.api_key_env
            ))
        })?;

        Ok(Self {
            client: Client::new(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// Download a remote audio file and transcribe it. The temporary file is
    /// removed on every exit path.
    pub async fn transcribe_remote(
        &self,
        audio_url: &str,
        language: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>> {
        let temp_dir = TempDir::new().context("Failed to create temporary directory")?;
        let audio_path = temp_dir
            .path()
            .join(generate_unique_filename("remote", "mp3"));

        self.download_audio_file(audio_url, &audio_path).await?;
        self.transcribe_file(&audio_path, language).await
    }

    async fn download_audio_file(&self, audio_url: &str, audio_path: &Path) -> Result<()> {
        tracing::info!("Downloading audio from: {}", audio_url);

        let response = self.client.get(audio_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to download audio: HTTP {}", response.status());
        }

        let total_size = response.content_length().unwrap_or(0);
        let progress = ProgressBar::new(total_size);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        {
            progress.set_style(style);
        }
        progress.set_message("Downloading audio...");

        let mut file = fs_err::File::create(audio_path)?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
            progress.set_position(downloaded);
        }
        progress.finish_with_message("Download complete");

        Ok(())
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    async fn transcribe_file(
        &self,
        audio_path: &Path,
        language: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>> {
        check_file_accessible(audio_path)?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());
        let bytes = fs_err::read(audio_path)?;

        tracing::info!(
            "Posting {} ({} bytes) to transcription API",
            file_name,
            bytes.len()
        );

        let mut form = Form::new()
            .part(
                "file",
                Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")?,
            )
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            progress.set_style(style);
        }
        progress.set_message("Waiting for transcription...");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach transcription API")?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            progress.finish_with_message("Transcription rate limited");
            return Err(TranscriptorError::RateLimited("transcription API".to_string()).into());
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            progress.finish_with_message("Transcription rejected");
            return Err(TranscriptorError::ConfigurationError(
                "transcription API rejected the configured credentials".to_string(),
            )
            .into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            progress.finish_with_message("Transcription failed");
            return Err(
                TranscriptorError::TranscriptionFailed(format!("HTTP {}: {}", status, body))
                    .into(),
            );
        }

        let parsed: WhisperResponse = response
            .json()
            .await
            .map_err(|e| TranscriptorError::ParseFailure(e.to_string()))?;

        progress.finish_with_message("Transcription complete");
        Ok(segments_from_response(parsed))
    }
}

/// Map the API's segment list (or flat text) into normalized segments.
fn segments_from_response(response: WhisperResponse) -> Vec<TranscriptSegment> {
    if let Some(segments) = response.segments {
        if !segments.is_empty() {
            return assemble(
                segments
                    .into_iter()
                    .map(|s| (s.text.trim().to_string(), s.start, s.end))
                    .filter(|(text, _, _)| !text.is_empty())
                    .collect(),
            );
        }
    }

    match response.text {
        Some(text) if !text.trim().is_empty() => {
            assemble(vec![(text.trim().to_string(), 0.0, 0.0)])
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_list_is_mapped_in_order() {
        let response = WhisperResponse {
            text: Some("ignored when segments exist".to_string()),
            segments: Some(vec![
                WhisperSegment {
                    start: 0.0,
                    end: 2.5,
                    text: " Hello there ".to_string(),
                },
                WhisperSegment {
                    start: 2.5,
                    end: 4.0,
                    text: "general".to_string(),
                },
            ]),
        };
        let segments = segments_from_response(response);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].id, 1);
        assert_eq!(segments[0].text, "Hello there");
        assert_eq!(segments[0].words, vec!["Hello", "there"]);
        assert_eq!(segments[1].id, 2);
        assert_eq!(segments[1].end_time, 4.0);
    }

    #[test]
    fn test_flat_text_becomes_single_segment() {
        let response = WhisperResponse {
            text: Some("just a flat transcript".to_string()),
            segments: None,
        };
        let segments = segments_from_response(response);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_time, 0.0);
        assert_eq!(segments[0].words.len(), 4);
    }

    #[test]
    fn test_empty_response_yields_empty_transcript() {
        let response = WhisperResponse {
            text: None,
            segments: Some(vec![]),
        };
        assert!(segments_from_response(response).is_empty());
    }
}
