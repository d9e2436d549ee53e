use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;

use super::{CaptionKind, CaptionMethod, CaptionSource, LanguagePolicy, RawCaptions};
use crate::transcript::parse::CaptionFormat;
use crate::utils::classify_ytdlp_stderr;
use crate::Result;

/// Subtitle track advertised by yt-dlp's video description.
#[derive(Debug, Clone)]
struct SubtitleTrack {
    language_code: String,
    generated: bool,
}

/// External CLI caption source backed by yt-dlp.
///
/// Probes the video description for available subtitle languages, then
/// downloads the selected track as json3, falling back to plain VTT when the
/// first attempt produces no output file.
pub struct YtDlpSource {
    yt_dlp_path: String,
}

impl YtDlpSource {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    /// Ask yt-dlp which languages carry manual vs auto-generated captions.
    async fn probe_tracks(&self, video_url: &str) -> Result<Vec<SubtitleTrack>> {
        tracing::debug!("Probing subtitle languages for: {}", video_url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--skip-download", "--no-playlist", video_url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_ytdlp_stderr(&stderr).into());
        }

        let info: Value = serde_json::from_str(&String::from_utf8(output.stdout)?)?;

        let mut tracks = Vec::new();
        let mut collect = |key: &str, generated: bool| {
            if let Some(map) = info.get(key).and_then(|v| v.as_object()) {
                for language_code in map.keys() {
                    tracks.push(SubtitleTrack {
                        language_code: language_code.clone(),
                        generated,
                    });
                }
            }
        };
        collect("subtitles", false);
        collect("automatic_captions", true);

        Ok(tracks)
    }

    /// Invoke yt-dlp to write one subtitle file into `dir`; returns the file
    /// produced, if any. Exit code 0 with no file still means "nothing".
    async fn download_subtitles(
        &self,
        video_url: &str,
        language: &str,
        generated: bool,
        format: &str,
        dir: &Path,
    ) -> Result<Option<PathBuf>> {
        let template = dir.join("%(id)s.%(ext)s");

        let write_flag = if generated {
            "--write-auto-sub"
        } else {
            "--write-sub"
        };

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--skip-download",
                write_flag,
                "--sub-lang",
                language,
                "--sub-format",
                format,
                "--no-playlist",
                "--no-warnings",
                "--output",
                &template.to_string_lossy(),
                video_url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_ytdlp_stderr(&stderr).into());
        }

        Ok(Self::find_subtitle_file(dir, format, language))
    }

    /// Locate the downloaded subtitle file, preferring one tagged with the
    /// requested language code.
    fn find_subtitle_file(dir: &Path, extension: &str, language: &str) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
            .ok()?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e == extension)
                    .unwrap_or(false)
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }
        let tag = format!(".{}", language);
        candidates.sort_by_key(|path| {
            let name = path.file_name().map(|n| n.to_string_lossy().to_string());
            if name.map(|n| n.contains(&tag)).unwrap_or(false) {
                0
            } else {
                1
            }
        });
        candidates.into_iter().next()
    }
}

#[async_trait]
impl CaptionSource for YtDlpSource {
    async fn fetch_captions(
        &self,
        video_id: &str,
        policy: &LanguagePolicy,
    ) -> Result<Option<RawCaptions>> {
        let video_url = format!("https://www.youtube.com/watch?v={}", video_id);

        let tracks = self.probe_tracks(&video_url).await?;
        let Some(track) = policy.select(&tracks, |t| t.language_code.as_str(), |t| t.generated)
        else {
            tracing::debug!(
                "yt-dlp lists no subtitles for {} matching language chain",
                video_id
            );
            return Ok(None);
        };
        let language = track.language_code.clone();
        let generated = track.generated;

        let temp_dir = TempDir::new()?;

        let json3 = self
            .download_subtitles(&video_url, &language, generated, "json3", temp_dir.path())
            .await?;
        if let Some(path) = json3 {
            let body = fs_err::read_to_string(&path)?;
            return Ok(Some(RawCaptions {
                body,
                format: CaptionFormat::Json3,
                language,
                kind: if generated {
                    CaptionKind::AutoGenerated
                } else {
                    CaptionKind::Manual
                },
            }));
        }

        tracing::debug!("json3 attempt produced no file, retrying with vtt");
        let vtt = self
            .download_subtitles(&video_url, &language, generated, "vtt", temp_dir.path())
            .await?;
        if let Some(path) = vtt {
            let body = fs_err::read_to_string(&path)?;
            return Ok(Some(RawCaptions {
                body,
                format: CaptionFormat::WebVtt,
                language,
                kind: if generated {
                    CaptionKind::AutoGenerated
                } else {
                    CaptionKind::Manual
                },
            }));
        }

        Ok(None)
    }

    fn method(&self) -> CaptionMethod {
        CaptionMethod::YtDlpSubtitles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_subtitle_file_prefers_language_tag() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("abc.ja.vtt"), "x").unwrap();
        std::fs::write(dir.path().join("abc.en.vtt"), "x").unwrap();

        let found = YtDlpSource::find_subtitle_file(dir.path(), "vtt", "en").unwrap();
        assert!(found.to_string_lossy().contains(".en."));
    }

    #[test]
    fn test_find_subtitle_file_filters_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("abc.en.vtt"), "x").unwrap();

        assert!(YtDlpSource::find_subtitle_file(dir.path(), "json3", "en").is_none());
        assert!(YtDlpSource::find_subtitle_file(dir.path(), "vtt", "en").is_some());
    }

    #[test]
    fn test_method_name() {
        assert_eq!(
            YtDlpSource::new("yt-dlp").method(),
            CaptionMethod::YtDlpSubtitles
        );
    }
}
