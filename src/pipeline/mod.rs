use serde::Serialize;
use std::collections::BTreeMap;

use crate::captions::{
    player::PlayerMetadataSource, timedtext::TimedTextSource, ytdlp::YtDlpSource, CaptionMethod,
    CaptionSource, LanguagePolicy,
};
use crate::config::Config;
use crate::transcript::{parse::parse_captions, TranscriptSegment};
use crate::video::extract_video_id;
use crate::{Result, TranscriptorError};

/// How a transcript was ultimately obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    Timedtext,
    YoutubeApi,
    YtDlpSubtitles,
    AudioTranscription,
}

impl From<CaptionMethod> for ExtractionMethod {
    fn from(method: CaptionMethod) -> Self {
        match method {
            CaptionMethod::Timedtext => ExtractionMethod::Timedtext,
            CaptionMethod::YoutubeApi => ExtractionMethod::YoutubeApi,
            CaptionMethod::YtDlpSubtitles => ExtractionMethod::YtDlpSubtitles,
        }
    }
}

/// Per-method outcome recorded for every attempted stage.
#[derive(Debug, Clone, Serialize)]
pub struct MethodDiagnostic {
    pub success: bool,
    /// Segment count on success, error text on failure
    pub detail: String,
}

/// Outcome of the fallback pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,
    pub transcript: Vec<TranscriptSegment>,
    pub language: String,
    pub is_auto_generated: bool,
    pub method: Option<ExtractionMethod>,
    pub audio_extraction_available: bool,
    pub diagnostics: BTreeMap<String, MethodDiagnostic>,
}

impl ExtractionResult {
    /// Result shape for the audio-transcription fallback path.
    pub fn from_transcription(transcript: Vec<TranscriptSegment>, language: String) -> Self {
        let mut diagnostics = BTreeMap::new();
        diagnostics.insert(
            "audio-transcription".to_string(),
            MethodDiagnostic {
                success: true,
                detail: format!("{} segments", transcript.len()),
            },
        );
        Self {
            success: !transcript.is_empty(),
            transcript,
            language,
            is_auto_generated: true,
            method: Some(ExtractionMethod::AudioTranscription),
            audio_extraction_available: false,
            diagnostics,
        }
    }
}

/// Sequential fallback orchestrator over the configured caption sources.
///
/// Stages run strictly in sequence; the first non-empty transcript is
/// terminal. Adapter failures become diagnostics, never faults.
pub struct ExtractionPipeline {
    policy: LanguagePolicy,
    methods: Vec<CaptionMethod>,
    sources: Vec<Box<dyn CaptionSource>>,
}

impl ExtractionPipeline {
    /// Build the pipeline with the production caption sources.
    pub fn new(config: &Config) -> Self {
        let sources: Vec<Box<dyn CaptionSource>> = vec![
            Box::new(TimedTextSource::new()),
            Box::new(PlayerMetadataSource::new()),
            Box::new(YtDlpSource::new(config.audio.yt_dlp_path.clone())),
        ];
        Self {
            policy: config.captions.policy(),
            methods: config.captions.methods.clone(),
            sources,
        }
    }

    /// Build the pipeline with caller-supplied sources.
    pub fn with_sources(
        policy: LanguagePolicy,
        methods: Vec<CaptionMethod>,
        sources: Vec<Box<dyn CaptionSource>>,
    ) -> Self {
        Self {
            policy,
            methods,
            sources,
        }
    }

    fn stage_order(&self, prefer_captions: bool) -> Vec<CaptionMethod> {
        self.methods
            .iter()
            .copied()
            .filter(|method| prefer_captions || *method != CaptionMethod::Timedtext)
            .collect()
    }

    /// Try caption sources in priority order; offer audio extraction when
    /// every stage comes up empty.
    pub async fn extract_transcript(
        &self,
        url: &str,
        prefer_captions: bool,
    ) -> Result<ExtractionResult> {
        let video_id = extract_video_id(url).ok_or_else(|| {
            TranscriptorError::NotFound(format!("no video identifier in input: {}", url))
        })?;

        tracing::info!("Extracting transcript for video {}", video_id);

        let mut diagnostics = BTreeMap::new();

        for method in self.stage_order(prefer_captions) {
            let Some(source) = self.sources.iter().find(|s| s.method() == method) else {
                continue;
            };

            tracing::debug!("Trying caption method: {}", method);
            match source.fetch_captions(&video_id, &self.policy).await {
                Ok(Some(raw)) => {
                    let segments = parse_captions(raw.format, &raw.body);
                    if segments.is_empty() {
                        diagnostics.insert(
                            method.as_str().to_string(),
                            MethodDiagnostic {
                                success: false,
                                detail: "captions fetched but no segments parsed".to_string(),
                            },
                        );
                        continue;
                    }

                    diagnostics.insert(
                        method.as_str().to_string(),
                        MethodDiagnostic {
                            success: true,
                            detail: format!("{} segments", segments.len()),
                        },
                    );
                    tracing::info!(
                        "Method {} produced {} segments ({})",
                        method,
                        segments.len(),
                        raw.language
                    );
                    return Ok(ExtractionResult {
                        success: true,
                        transcript: segments,
                        language: raw.language,
                        is_auto_generated: raw.kind.is_auto_generated(),
                        method: Some(method.into()),
                        audio_extraction_available: false,
                        diagnostics,
                    });
                }
                Ok(None) => {
                    diagnostics.insert(
                        method.as_str().to_string(),
                        MethodDiagnostic {
                            success: false,
                            detail: "no captions found".to_string(),
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!("Caption method {} failed: {}", method, e);
                    diagnostics.insert(
                        method.as_str().to_string(),
                        MethodDiagnostic {
                            success: false,
                            detail: e.to_string(),
                        },
                    );
                }
            }
        }

        Ok(ExtractionResult {
            success: false,
            transcript: Vec::new(),
            language: self.policy.language.clone(),
            is_auto_generated: false,
            method: None,
            audio_extraction_available: true,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{CaptionKind, MockCaptionSource, RawCaptions};
    use crate::transcript::parse::CaptionFormat;

    const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn mock_source(
        method: CaptionMethod,
        outcome: impl Fn() -> Result<Option<RawCaptions>> + Send + Sync + 'static,
    ) -> Box<dyn CaptionSource> {
        let mut mock = MockCaptionSource::new();
        mock.expect_method().return_const(method);
        mock.expect_fetch_captions()
            .returning(move |_, _| outcome());
        Box::new(mock)
    }

    fn two_segment_captions() -> RawCaptions {
        RawCaptions {
            body: r#"{"events":[
                {"segs":[{"utf8":"first"}],"tStartMs":0,"dDurationMs":1000},
                {"segs":[{"utf8":"second"}],"tStartMs":1000,"dDurationMs":1000}
            ]}"#
            .to_string(),
            format: CaptionFormat::Json3,
            language: "en".to_string(),
            kind: CaptionKind::Manual,
        }
    }

    fn default_methods() -> Vec<CaptionMethod> {
        vec![
            CaptionMethod::Timedtext,
            CaptionMethod::YoutubeApi,
            CaptionMethod::YtDlpSubtitles,
        ]
    }

    #[tokio::test]
    async fn test_falls_through_to_second_method() {
        let pipeline = ExtractionPipeline::with_sources(
            LanguagePolicy::default(),
            default_methods(),
            vec![
                mock_source(CaptionMethod::Timedtext, || Ok(None)),
                mock_source(CaptionMethod::YoutubeApi, || Ok(Some(two_segment_captions()))),
                mock_source(CaptionMethod::YtDlpSubtitles, || {
                    panic!("later stage must not run after terminal success")
                }),
            ],
        );

        let result = pipeline.extract_transcript(VIDEO_URL, true).await.unwrap();
        assert!(result.success);
        assert_eq!(result.method, Some(ExtractionMethod::YoutubeApi));
        assert_eq!(result.transcript.len(), 2);
        assert_eq!(result.transcript[0].text, "first");
        assert_eq!(result.transcript[1].text, "second");
        assert!(!result.audio_extraction_available);

        // diagnostics are auditable even on success
        assert!(!result.diagnostics["timedtext"].success);
        assert!(result.diagnostics["youtube-api"].success);
        assert_eq!(result.diagnostics["youtube-api"].detail, "2 segments");
    }

    #[tokio::test]
    async fn test_all_empty_offers_audio_extraction() {
        let pipeline = ExtractionPipeline::with_sources(
            LanguagePolicy::default(),
            default_methods(),
            vec![
                mock_source(CaptionMethod::Timedtext, || Ok(None)),
                mock_source(CaptionMethod::YoutubeApi, || Ok(None)),
                mock_source(CaptionMethod::YtDlpSubtitles, || Ok(None)),
            ],
        );

        let result = pipeline.extract_transcript(VIDEO_URL, true).await.unwrap();
        assert!(!result.success);
        assert!(result.audio_extraction_available);
        assert!(result.transcript.is_empty());
        assert_eq!(result.method, None);
        assert_eq!(result.diagnostics.len(), 3);
    }

    #[tokio::test]
    async fn test_adapter_error_becomes_diagnostic_not_fault() {
        let pipeline = ExtractionPipeline::with_sources(
            LanguagePolicy::default(),
            default_methods(),
            vec![
                mock_source(CaptionMethod::Timedtext, || {
                    Err(TranscriptorError::UpstreamBlocked("bot check".to_string()).into())
                }),
                mock_source(CaptionMethod::YoutubeApi, || Ok(Some(two_segment_captions()))),
                mock_source(CaptionMethod::YtDlpSubtitles, || Ok(None)),
            ],
        );

        let result = pipeline.extract_transcript(VIDEO_URL, true).await.unwrap();
        assert!(result.success);
        assert_eq!(result.method, Some(ExtractionMethod::YoutubeApi));
        let timedtext = &result.diagnostics["timedtext"];
        assert!(!timedtext.success);
        assert!(timedtext.detail.contains("bot detection"));
    }

    #[tokio::test]
    async fn test_prefer_captions_false_skips_timedtext() {
        let pipeline = ExtractionPipeline::with_sources(
            LanguagePolicy::default(),
            default_methods(),
            vec![
                mock_source(CaptionMethod::Timedtext, || {
                    panic!("timedtext must be skipped when captions are not preferred")
                }),
                mock_source(CaptionMethod::YoutubeApi, || Ok(Some(two_segment_captions()))),
                mock_source(CaptionMethod::YtDlpSubtitles, || Ok(None)),
            ],
        );

        let result = pipeline.extract_transcript(VIDEO_URL, false).await.unwrap();
        assert!(result.success);
        assert_eq!(result.method, Some(ExtractionMethod::YoutubeApi));
        assert!(!result.diagnostics.contains_key("timedtext"));
    }

    #[tokio::test]
    async fn test_unparseable_captions_fall_through() {
        let pipeline = ExtractionPipeline::with_sources(
            LanguagePolicy::default(),
            default_methods(),
            vec![
                mock_source(CaptionMethod::Timedtext, || {
                    Ok(Some(RawCaptions {
                        body: "garbage".to_string(),
                        format: CaptionFormat::Json3,
                        language: "en".to_string(),
                        kind: CaptionKind::Unknown,
                    }))
                }),
                mock_source(CaptionMethod::YoutubeApi, || Ok(Some(two_segment_captions()))),
                mock_source(CaptionMethod::YtDlpSubtitles, || Ok(None)),
            ],
        );

        let result = pipeline.extract_transcript(VIDEO_URL, true).await.unwrap();
        assert!(result.success);
        assert_eq!(result.method, Some(ExtractionMethod::YoutubeApi));
        assert_eq!(
            result.diagnostics["timedtext"].detail,
            "captions fetched but no segments parsed"
        );
    }

    #[tokio::test]
    async fn test_missing_video_id_is_a_fault() {
        let pipeline = ExtractionPipeline::with_sources(
            LanguagePolicy::default(),
            default_methods(),
            vec![],
        );
        let err = pipeline
            .extract_transcript("https://example.com/nope", true)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TranscriptorError>(),
            Some(TranscriptorError::NotFound(_))
        ));
    }

    #[test]
    fn test_transcription_result_shape() {
        let segments = crate::transcript::assemble(vec![("hello".to_string(), 0.0, 1.0)]);
        let result = ExtractionResult::from_transcription(segments, "en".to_string());
        assert!(result.success);
        assert_eq!(result.method, Some(ExtractionMethod::AudioTranscription));
        assert!(result.diagnostics["audio-transcription"].success);
    }
}
