use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "yt-transcriptor",
    about = "YouTube Transcriptor - Extract video transcripts from captions, with audio-transcription fallback",
    version,
    long_about = "A CLI tool for extracting YouTube transcripts. Caption sources are tried in priority order (timed-text endpoint, player metadata, yt-dlp subtitles); when a video has no captions the audio can be extracted and sent to a whisper-style transcription API."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract a transcript from the video's captions
    Extract {
        /// YouTube URL or bare video id
        #[arg(value_name = "URL")]
        url: String,

        /// Try the timed-text endpoint before metadata scraping
        #[arg(long, value_name = "BOOL", default_value_t = true, action = clap::ArgAction::Set)]
        prefer_captions: bool,

        /// Target language code (overrides config)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Fallback language when the target is unavailable (overrides config)
        #[arg(long, value_name = "LANG")]
        fallback_language: Option<String>,

        /// Output format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Include start timestamps in text output
        #[arg(long)]
        timestamps: bool,
    },

    /// Extract a transcript, falling back to audio transcription when the
    /// video has no captions
    Transcribe {
        /// YouTube URL or bare video id
        #[arg(value_name = "URL")]
        url: String,

        /// Target language code (overrides config)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Output format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Keep the extracted audio file next to the transcript
        #[arg(long)]
        keep_audio: bool,

        /// Include start timestamps in text output
        #[arg(long)]
        timestamps: bool,
    },

    /// Download a video's audio track as mp3
    Audio {
        /// YouTube URL or bare video id
        #[arg(value_name = "URL")]
        url: String,

        /// Output file path (defaults to a generated name in the current directory)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show or edit configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List caption methods in the order they are tried
    Methods,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with diagnostics and timestamps
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
    /// CSV format
    Csv,
}

impl OutputFormat {
    /// Resolve a configured format name, falling back to plain text.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "srt" => OutputFormat::Srt,
            "vtt" => OutputFormat::Vtt,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Text,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
