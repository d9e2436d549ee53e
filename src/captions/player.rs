use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{CaptionKind, CaptionMethod, CaptionSource, LanguagePolicy, RawCaptions};
use crate::transcript::parse::CaptionFormat;
use crate::{Result, TranscriptorError};

/// Metadata endpoint variants, tried in sequence until one yields a
/// parseable payload.
const VIDEO_INFO_VARIANTS: [&str; 3] = ["detailpage", "embedded", ""];

/// Caption track entry from the player metadata payload.
#[derive(Debug, Clone)]
struct CaptionTrack {
    language_code: String,
    base_url: String,
    generated: bool,
}

/// Page-metadata caption source.
///
/// Fetches player metadata, extracts the embedded `player_response` JSON,
/// selects a caption track per the language policy and fetches its body.
pub struct PlayerMetadataSource {
    client: Client,
}

impl PlayerMetadataSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Try each metadata endpoint variant until one produces a parseable
    /// player response. Variant failures are logged, not raised.
    async fn fetch_player_response(&self, video_id: &str) -> Result<Value> {
        for variant in VIDEO_INFO_VARIANTS {
            let url = if variant.is_empty() {
                format!(
                    "https://www.youtube.com/get_video_info?video_id={}&html5=1",
                    video_id
                )
            } else {
                format!(
                    "https://www.youtube.com/get_video_info?video_id={}&el={}&html5=1",
                    video_id, variant
                )
            };

            let response = match self.client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!("Metadata variant {:?} failed: {}", variant, e);
                    continue;
                }
            };
            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(TranscriptorError::RateLimited(video_id.to_string()).into());
            }
            if !response.status().is_success() {
                tracing::debug!(
                    "Metadata variant {:?} returned HTTP {}",
                    variant,
                    response.status()
                );
                continue;
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!("Metadata variant {:?} unreadable: {}", variant, e);
                    continue;
                }
            };

            // URL-encoded form data with the JSON payload under player_response
            let player_json = url::form_urlencoded::parse(body.as_bytes())
                .find(|(key, _)| key == "player_response")
                .map(|(_, value)| value.into_owned());

            let Some(player_json) = player_json else {
                tracing::debug!("Metadata variant {:?} carried no player_response", variant);
                continue;
            };

            match serde_json::from_str::<Value>(&player_json) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::debug!("Metadata variant {:?} payload unparseable: {}", variant, e);
                    continue;
                }
            }
        }

        Err(TranscriptorError::ParseFailure(format!(
            "no metadata endpoint variant yielded a parseable player response for {}",
            video_id
        ))
        .into())
    }

    fn check_playability(video_id: &str, player_response: &Value) -> Result<()> {
        let Some(status) = player_response.get("playabilityStatus") else {
            return Ok(());
        };
        let state = status.get("status").and_then(|s| s.as_str()).unwrap_or("");
        if state == "OK" || state.is_empty() {
            return Ok(());
        }
        let reason = status.get("reason").and_then(|r| r.as_str()).unwrap_or("");

        if state == "LOGIN_REQUIRED" && reason.contains("not a bot") {
            return Err(TranscriptorError::UpstreamBlocked(video_id.to_string()).into());
        }
        if state == "ERROR" {
            return Err(TranscriptorError::UpstreamUnavailable(format!(
                "{}: {}",
                video_id, reason
            ))
            .into());
        }
        Ok(())
    }

    fn caption_tracks(player_response: &Value) -> Vec<CaptionTrack> {
        player_response
            .get("captions")
            .and_then(|c| c.get("playerCaptionsTracklistRenderer"))
            .and_then(|r| r.get("captionTracks"))
            .and_then(|t| t.as_array())
            .map(|tracks| {
                tracks
                    .iter()
                    .filter_map(|track| {
                        let language_code =
                            track.get("languageCode")?.as_str()?.to_string();
                        let base_url = track
                            .get("baseUrl")?
                            .as_str()?
                            .replace("&fmt=srv3", "");
                        let generated = track
                            .get("kind")
                            .and_then(|k| k.as_str())
                            .map(|k| k == "asr")
                            .unwrap_or(false);
                        Some(CaptionTrack {
                            language_code,
                            base_url,
                            generated,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn fetch_track_body(&self, track: &CaptionTrack) -> Result<String> {
        let response = self.client.get(&track.base_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!(
                "Caption track fetch returned HTTP {}",
                response.status()
            );
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl CaptionSource for PlayerMetadataSource {
    async fn fetch_captions(
        &self,
        video_id: &str,
        policy: &LanguagePolicy,
    ) -> Result<Option<RawCaptions>> {
        let player_response = self.fetch_player_response(video_id).await?;
        Self::check_playability(video_id, &player_response)?;

        let tracks = Self::caption_tracks(&player_response);
        if tracks.is_empty() {
            tracing::debug!("No caption tracks listed for {}", video_id);
            return Ok(None);
        }

        let Some(track) = policy.select(&tracks, |t| t.language_code.as_str(), |t| t.generated)
        else {
            tracing::debug!(
                "No caption track for {} matches language chain {:?}",
                video_id,
                policy.chain()
            );
            return Ok(None);
        };

        let body = self.fetch_track_body(track).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(RawCaptions {
            body,
            format: CaptionFormat::TrackXml,
            language: track.language_code.clone(),
            kind: if track.generated {
                CaptionKind::AutoGenerated
            } else {
                CaptionKind::Manual
            },
        }))
    }

    fn method(&self) -> CaptionMethod {
        CaptionMethod::YoutubeApi
    }
}

impl Default for PlayerMetadataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_response(tracks: serde_json::Value) -> Value {
        serde_json::json!({
            "playabilityStatus": { "status": "OK" },
            "captions": {
                "playerCaptionsTracklistRenderer": { "captionTracks": tracks }
            }
        })
    }

    #[test]
    fn test_caption_tracks_extraction() {
        let value = player_response(serde_json::json!([
            { "languageCode": "en", "baseUrl": "https://example.com/tt?lang=en&fmt=srv3" },
            { "languageCode": "ja", "baseUrl": "https://example.com/tt?lang=ja", "kind": "asr" }
        ]));
        let tracks = PlayerMetadataSource::caption_tracks(&value);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language_code, "en");
        assert!(!tracks[0].base_url.contains("fmt=srv3"));
        assert!(!tracks[0].generated);
        assert!(tracks[1].generated);
    }

    #[test]
    fn test_caption_tracks_missing_renderer() {
        let value = serde_json::json!({ "playabilityStatus": { "status": "OK" } });
        assert!(PlayerMetadataSource::caption_tracks(&value).is_empty());
    }

    #[test]
    fn test_playability_bot_check_is_blocked() {
        let value = serde_json::json!({
            "playabilityStatus": {
                "status": "LOGIN_REQUIRED",
                "reason": "Sign in to confirm you're not a bot"
            }
        });
        let err = PlayerMetadataSource::check_playability("abc", &value).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TranscriptorError>(),
            Some(TranscriptorError::UpstreamBlocked(_))
        ));
    }

    #[test]
    fn test_playability_error_is_unavailable() {
        let value = serde_json::json!({
            "playabilityStatus": { "status": "ERROR", "reason": "Video unavailable" }
        });
        let err = PlayerMetadataSource::check_playability("abc", &value).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TranscriptorError>(),
            Some(TranscriptorError::UpstreamUnavailable(_))
        ));
    }

    #[test]
    fn test_playability_ok() {
        let value = serde_json::json!({ "playabilityStatus": { "status": "OK" } });
        assert!(PlayerMetadataSource::check_playability("abc", &value).is_ok());
    }
}
