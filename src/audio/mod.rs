use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::sleep;

use crate::config::AudioConfig;
use crate::utils::{classify_ytdlp_stderr, format_file_size};
use crate::{Result, TranscriptorError};

/// Browser User-Agent strings rotated across retry attempts.
const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

/// Bounded retry with linear backoff and random jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_jitter: Duration::from_millis(750),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt; `attempt` is 1-based.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms = if self.max_jitter.is_zero() {
            0
        } else {
            rand::thread_rng().gen_range(0..self.max_jitter.as_millis() as u64)
        };
        self.base_delay * attempt + Duration::from_millis(jitter_ms)
    }

    /// User-Agent for the given 1-based attempt.
    pub fn user_agent_for(&self, attempt: u32) -> &'static str {
        USER_AGENTS[attempt.saturating_sub(1) as usize % USER_AGENTS.len()]
    }
}

/// Capability trait for audio extraction, so the CLI flow can be composed
/// without a real yt-dlp binary.
#[async_trait]
pub trait AudioDownloader: Send + Sync {
    /// Download the audio track of `url` to `output_path` as mp3.
    async fn download_audio(&self, url: &str, output_path: &Path) -> Result<PathBuf>;
}

/// yt-dlp-backed audio downloader with retry, User-Agent rotation and
/// optional proxy.
pub struct YtDlpAudioDownloader {
    yt_dlp_path: String,
    proxy: Option<String>,
    retry: RetryPolicy,
}

impl YtDlpAudioDownloader {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            yt_dlp_path: config.yt_dlp_path.clone(),
            proxy: config.proxy.clone(),
            retry: RetryPolicy {
                max_attempts: config.max_retries.max(1),
                base_delay: Duration::from_secs(config.retry_delay_secs),
                ..RetryPolicy::default()
            },
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> Result<bool> {
        let output = Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        Ok(output.map(|o| o.status.success()).unwrap_or(false))
    }

    async fn run_ytdlp(&self, url: &str, output_path: &Path, attempt: u32) -> Result<()> {
        let mut command = Command::new(&self.yt_dlp_path);
        command.args([
            "--output",
            &output_path.to_string_lossy(),
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "9",
            "--format",
            "worstaudio[acodec^=mp4a]/worstaudio[ext=m4a]/worstaudio[ext=mp3]/worstaudio",
            "--no-playlist",
            "--user-agent",
            self.retry.user_agent_for(attempt),
            "--newline",
        ]);
        if let Some(proxy) = &self.proxy {
            command.args(["--proxy", proxy]);
        }
        command.arg(url);

        let output = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_ytdlp_stderr(&stderr).into());
        }
        if !output_path.exists() {
            return Err(TranscriptorError::NotFound(format!(
                "yt-dlp exited 0 but produced no file at {}",
                output_path.display()
            ))
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl AudioDownloader for YtDlpAudioDownloader {
    async fn download_audio(&self, url: &str, output_path: &Path) -> Result<PathBuf> {
        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            progress.set_style(style);
        }
        progress.set_message("Downloading audio with yt-dlp...");

        let mut last_error = None;
        for attempt in 1..=self.retry.max_attempts {
            tracing::debug!(
                "Audio download attempt {}/{} for {}",
                attempt,
                self.retry.max_attempts,
                url
            );

            match self.run_ytdlp(url, output_path, attempt).await {
                Ok(()) => {
                    let size = fs_err::metadata(output_path).map(|m| m.len()).unwrap_or(0);
                    progress.finish_with_message(format!(
                        "Download complete ({})",
                        format_file_size(size)
                    ));
                    return Ok(output_path.to_path_buf());
                }
                Err(e) => {
                    // a gone video will not come back; blocked or rate-limited
                    // requests may succeed under a different fingerprint
                    let retryable = !matches!(
                        e.downcast_ref::<TranscriptorError>(),
                        Some(TranscriptorError::UpstreamUnavailable(_))
                    );
                    tracing::warn!("Audio download attempt {} failed: {}", attempt, e);
                    last_error = Some(e);

                    if !retryable || attempt == self.retry.max_attempts {
                        break;
                    }
                    sleep(self.retry.delay_for(attempt)).await;
                }
            }
        }

        progress.finish_with_message("Download failed");
        Err(last_error.unwrap_or_else(|| {
            TranscriptorError::AudioExtractionFailed(url.to_string()).into()
        }))
    }
}
