//! YouTube Transcriptor - A Rust CLI tool for extracting video transcripts
//!
//! This library extracts transcripts from YouTube videos by trying caption
//! sources in priority order (timed-text endpoint, player metadata, yt-dlp
//! subtitles) and falling back to audio extraction plus a whisper-style
//! transcription API when no captions exist.

pub mod audio;
pub mod captions;
pub mod cli;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod transcribe;
pub mod transcript;
pub mod utils;
pub mod video;

pub use captions::{CaptionMethod, CaptionSource, RawCaptions};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use pipeline::{ExtractionPipeline, ExtractionResult};
pub use transcript::TranscriptSegment;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the transcriptor
#[derive(thiserror::Error, Debug)]
pub enum TranscriptorError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream rejected the request (bot detection): {0}")]
    UpstreamBlocked(String),

    #[error("Video unavailable (deleted, private, or region-locked): {0}")]
    UpstreamUnavailable(String),

    #[error("Rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("Failed to parse upstream payload: {0}")]
    ParseFailure(String),

    #[error("Missing or invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtractionFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),
}
