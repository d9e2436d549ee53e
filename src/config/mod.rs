use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::captions::{CaptionMethod, LanguagePolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Caption language and method preferences
    pub captions: CaptionSettings,

    /// Audio extraction settings
    pub audio: AudioConfig,

    /// Transcription API settings
    pub transcription: TranscriptionConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionSettings {
    /// Target language code
    pub language: String,

    /// Secondary language when the target is entirely unavailable;
    /// null makes absence a hard "not found"
    pub fallback_language: Option<String>,

    /// Prefer manual captions over auto-generated for the same language
    pub prefer_manual: bool,

    /// Caption methods in the order the orchestrator tries them
    pub methods: Vec<CaptionMethod>,
}

impl CaptionSettings {
    /// The language-selection policy passed into adapters and orchestrator.
    pub fn policy(&self) -> LanguagePolicy {
        LanguagePolicy {
            language: self.language.clone(),
            fallback_language: self.fallback_language.clone(),
            prefer_manual: self.prefer_manual,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Path to the yt-dlp binary
    pub yt_dlp_path: String,

    /// Optional proxy URL forwarded to yt-dlp
    pub proxy: Option<String>,

    /// Maximum download attempts
    pub max_retries: u32,

    /// Base delay between attempts in seconds
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Whisper-style transcription endpoint
    pub api_url: String,

    /// Model name sent with each request
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Temporary directory for downloads
    pub temp_dir: Option<PathBuf>,

    /// Keep audio files after transcription
    pub keep_audio: bool,

    /// Default output format
    pub default_output_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            captions: CaptionSettings {
                language: "en".to_string(),
                fallback_language: Some("en".to_string()),
                prefer_manual: true,
                methods: vec![
                    CaptionMethod::Timedtext,
                    CaptionMethod::YoutubeApi,
                    CaptionMethod::YtDlpSubtitles,
                ],
            },
            audio: AudioConfig {
                yt_dlp_path: "yt-dlp".to_string(),
                proxy: None,
                max_retries: 3,
                retry_delay_secs: 2,
            },
            transcription: TranscriptionConfig {
                api_url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
                model: "whisper-1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
            },
            app: AppConfig {
                temp_dir: None,
                keep_audio: false,
                default_output_format: "text".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content =
                fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            let config: Config =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("youtube-transcriptor").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.captions.language.trim().is_empty() {
            anyhow::bail!("Caption language must be configured");
        }
        if self.captions.methods.is_empty() {
            anyhow::bail!("At least one caption method must be configured");
        }
        if self.audio.max_retries == 0 {
            anyhow::bail!("audio.max_retries must be at least 1");
        }
        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Language: {}", self.captions.language);
        println!(
            "  Fallback Language: {}",
            self.captions.fallback_language.as_deref().unwrap_or("(none)")
        );
        println!("  Prefer Manual Captions: {}", self.captions.prefer_manual);
        let methods: Vec<&str> = self.captions.methods.iter().map(|m| m.as_str()).collect();
        println!("  Method Order: {}", methods.join(" -> "));
        println!("  yt-dlp Path: {}", self.audio.yt_dlp_path);
        if let Some(proxy) = &self.audio.proxy {
            println!("  Proxy: {}", proxy);
        }
        println!("  Transcription API: {}", self.transcription.api_url);
        println!("  Transcription Model: {}", self.transcription.model);
        println!("  Keep Audio: {}", self.app.keep_audio);
        println!("  Default Format: {}", self.app.default_output_format);
    }

    /// Interactive configuration setup
    pub async fn interactive_setup(&self) -> Result<()> {
        println!("Interactive configuration setup coming soon!");
        println!("For now, please edit the config file manually:");
        println!("  {}", Self::config_path()?.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_empty_methods_rejected() {
        let mut config = Config::default();
        config.captions.methods.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut config = Config::default();
        config.audio.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.captions.language, "en");
        assert_eq!(parsed.captions.methods, config.captions.methods);
        assert_eq!(parsed.transcription.model, "whisper-1");
    }

    #[test]
    fn test_method_names_serialize_kebab_case() {
        let yaml = serde_yaml::to_string(&Config::default().captions.methods).unwrap();
        assert!(yaml.contains("timedtext"));
        assert!(yaml.contains("youtube-api"));
        assert!(yaml.contains("yt-dlp-subtitles"));
    }
}
