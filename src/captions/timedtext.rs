use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{CaptionKind, CaptionMethod, CaptionSource, LanguagePolicy, RawCaptions};
use crate::transcript::parse::CaptionFormat;
use crate::{Result, TranscriptorError};

const TIMEDTEXT_URL: &str = "https://video.google.com/timedtext";

/// Direct timed-text endpoint lookup.
///
/// Tries a manual-caption lookup per language first, then retries the same
/// request with the auto-generated (`kind=asr`) variant.
pub struct TimedTextSource {
    client: Client,
}

impl TimedTextSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn lookup(&self, video_id: &str, language: &str, asr: bool) -> Result<String> {
        let mut url = Url::parse(TIMEDTEXT_URL)?;
        url.query_pairs_mut()
            .append_pair("lang", language)
            .append_pair("v", video_id);
        if asr {
            url.query_pairs_mut().append_pair("kind", "asr");
        }

        tracing::debug!("Timed-text lookup: {}", url);
        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TranscriptorError::RateLimited(video_id.to_string()).into());
        }
        if !response.status().is_success() {
            anyhow::bail!("Timed-text endpoint returned HTTP {}", response.status());
        }

        Ok(response.text().await?)
    }

    fn has_captions(body: &str) -> bool {
        !body.trim().is_empty() && body.contains("<text")
    }
}

#[async_trait]
impl CaptionSource for TimedTextSource {
    async fn fetch_captions(
        &self,
        video_id: &str,
        policy: &LanguagePolicy,
    ) -> Result<Option<RawCaptions>> {
        for language in policy.lookup_codes() {
            let body = self.lookup(video_id, &language, false).await?;
            if Self::has_captions(&body) {
                // kind is not reliably known on the manual branch
                return Ok(Some(RawCaptions {
                    body,
                    format: CaptionFormat::TimedText,
                    language,
                    kind: CaptionKind::Unknown,
                }));
            }

            let body = self.lookup(video_id, &language, true).await?;
            if Self::has_captions(&body) {
                return Ok(Some(RawCaptions {
                    body,
                    format: CaptionFormat::TimedText,
                    language,
                    kind: CaptionKind::AutoGenerated,
                }));
            }

            tracing::debug!("No timed-text captions for {} in {}", video_id, language);
        }

        Ok(None)
    }

    fn method(&self) -> CaptionMethod {
        CaptionMethod::Timedtext
    }
}

impl Default for TimedTextSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_captions() {
        assert!(TimedTextSource::has_captions(
            r#"<transcript><text start="0" dur="1">hi</text></transcript>"#
        ));
        assert!(!TimedTextSource::has_captions(""));
        assert!(!TimedTextSource::has_captions("   \n"));
        assert!(!TimedTextSource::has_captions("<transcript></transcript>"));
    }

    #[test]
    fn test_method_name() {
        assert_eq!(TimedTextSource::new().method(), CaptionMethod::Timedtext);
    }
}
