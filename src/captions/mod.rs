use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod player;
pub mod timedtext;
pub mod ytdlp;

use crate::transcript::parse::CaptionFormat;
use crate::Result;

/// Caption source methods, in the order the orchestrator can try them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptionMethod {
    Timedtext,
    YoutubeApi,
    YtDlpSubtitles,
}

impl CaptionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionMethod::Timedtext => "timedtext",
            CaptionMethod::YoutubeApi => "youtube-api",
            CaptionMethod::YtDlpSubtitles => "yt-dlp-subtitles",
        }
    }
}

impl std::fmt::Display for CaptionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a caption track was authored by a human or machine-generated.
///
/// The timed-text endpoint cannot assert the kind on its manual branch, so
/// `Unknown` is carried instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptionKind {
    Manual,
    AutoGenerated,
    Unknown,
}

impl CaptionKind {
    pub fn is_auto_generated(&self) -> bool {
        matches!(self, CaptionKind::AutoGenerated)
    }
}

/// Raw caption payload produced by a source adapter.
#[derive(Debug, Clone)]
pub struct RawCaptions {
    /// Unparsed caption body
    pub body: String,

    /// Payload format, selects the parser
    pub format: CaptionFormat,

    /// Language code the source actually served
    pub language: String,

    /// Manual vs auto-generated, where the source can tell
    pub kind: CaptionKind,
}

/// Capability trait for caption sources.
///
/// `Ok(None)` means the source was reachable but found no captions for the
/// requested languages; `Err` means the method itself is broken (network,
/// parse, blocked). Callers must be able to tell the two apart.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn fetch_captions(
        &self,
        video_id: &str,
        policy: &LanguagePolicy,
    ) -> Result<Option<RawCaptions>>;

    fn method(&self) -> CaptionMethod;
}

/// One step of the language fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePreference {
    pub code: String,
    /// Exact code match vs any regional variant of the base code
    pub exact: bool,
}

/// Ordered language-selection policy applied wherever a method must pick
/// among available caption languages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagePolicy {
    /// Target language code, e.g. "en" or "ja"
    pub language: String,

    /// Secondary language tried when the target is entirely unavailable.
    /// `None` makes absence a hard "not found".
    pub fallback_language: Option<String>,

    /// Prefer human-authored captions over auto-generated for the same language
    pub prefer_manual: bool,
}

impl Default for LanguagePolicy {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            fallback_language: Some("en".to_string()),
            prefer_manual: true,
        }
    }
}

impl LanguagePolicy {
    /// The fallback chain: exact target, regional target, fallback,
    /// fallback-regional. Exhausting the chain means "not found".
    pub fn chain(&self) -> Vec<LanguagePreference> {
        let mut chain = vec![
            LanguagePreference {
                code: self.language.clone(),
                exact: true,
            },
            LanguagePreference {
                code: self.language.clone(),
                exact: false,
            },
        ];
        if let Some(fallback) = &self.fallback_language {
            if fallback != &self.language {
                chain.push(LanguagePreference {
                    code: fallback.clone(),
                    exact: true,
                });
                chain.push(LanguagePreference {
                    code: fallback.clone(),
                    exact: false,
                });
            }
        }
        chain
    }

    /// Concrete language codes for sources that cannot list availability and
    /// must issue direct lookups (the timed-text endpoint).
    pub fn lookup_codes(&self) -> Vec<String> {
        let mut codes = Vec::new();
        let mut push = |code: String| {
            if !codes.contains(&code) {
                codes.push(code);
            }
        };
        push(self.language.clone());
        push(crate::utils::normalize_language_code(&self.language));
        if let Some(fallback) = &self.fallback_language {
            push(fallback.clone());
            push(crate::utils::normalize_language_code(fallback));
        }
        codes
    }

    /// Select the best track from a listing, walking the chain in order and
    /// preferring manual captions over auto-generated within each step.
    pub fn select<'a, T>(
        &self,
        tracks: &'a [T],
        code_of: impl Fn(&T) -> &str,
        is_generated: impl Fn(&T) -> bool,
    ) -> Option<&'a T> {
        for preference in self.chain() {
            let mut candidates: Vec<&T> = tracks
                .iter()
                .filter(|t| code_matches(code_of(t), &preference))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            if self.prefer_manual {
                candidates.sort_by_key(|t| is_generated(t));
            }
            return candidates.into_iter().next();
        }
        None
    }
}

/// Match a track's language code against one chain step.
pub fn code_matches(track_code: &str, preference: &LanguagePreference) -> bool {
    if preference.exact {
        return track_code.eq_ignore_ascii_case(&preference.code);
    }
    let base = preference
        .code
        .split('-')
        .next()
        .unwrap_or(&preference.code)
        .to_ascii_lowercase();
    track_code
        .to_ascii_lowercase()
        .starts_with(&format!("{}-", base))
}
