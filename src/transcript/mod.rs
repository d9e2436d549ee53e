use serde::{Deserialize, Serialize};

pub mod parse;

/// One utterance unit of a normalized transcript.
///
/// Segments keep their source order; `id` is assigned in emission order,
/// contiguous from 1 within a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    /// 1-based sequence number, unique within a transcript
    pub id: usize,

    /// Decoded human-readable text (HTML/XML entities resolved)
    pub text: String,

    /// Start time in seconds
    pub start_time: f64,

    /// End time in seconds, never before `start_time`
    pub end_time: f64,

    /// Tokens of `text`, split on whitespace and Japanese sentence delimiters
    pub words: Vec<String>,
}

impl TranscriptSegment {
    pub fn new(id: usize, text: String, start_time: f64, end_time: f64) -> Self {
        let words = split_words(&text);
        let end_time = end_time.max(start_time);
        Self {
            id,
            text,
            start_time,
            end_time,
            words,
        }
    }
}

/// Sentence delimiters that close a word in Japanese text.
const JAPANESE_DELIMITERS: [char; 4] = ['、', '。', '！', '？'];

/// Split text into words on whitespace and Japanese sentence delimiters,
/// discarding empty tokens.
pub fn split_words(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || JAPANESE_DELIMITERS.contains(&c))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

/// Build a transcript from (text, start, end) triples, assigning ids in
/// emission order.
pub fn assemble(entries: Vec<(String, f64, f64)>) -> Vec<TranscriptSegment> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, (text, start, end))| TranscriptSegment::new(index + 1, text, start, end))
        .collect()
}

/// Total duration covered by a transcript, in seconds.
pub fn duration_seconds(segments: &[TranscriptSegment]) -> f64 {
    segments.last().map(|s| s.end_time).unwrap_or(0.0)
}

/// Join all segment texts into one plain-text transcript.
pub fn plain_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words_whitespace() {
        assert_eq!(split_words("hello world"), vec!["hello", "world"]);
        assert_eq!(split_words("  spaced   out  "), vec!["spaced", "out"]);
    }

    #[test]
    fn test_split_words_japanese_delimiters() {
        assert_eq!(
            split_words("こんにちは。元気ですか？はい"),
            vec!["こんにちは", "元気ですか", "はい"]
        );
        assert_eq!(split_words("こんにちは"), vec!["こんにちは"]);
    }

    #[test]
    fn test_split_words_discards_empty_tokens() {
        assert_eq!(split_words("。。！"), Vec::<String>::new());
        assert_eq!(split_words(""), Vec::<String>::new());
    }

    #[test]
    fn test_assemble_ids_contiguous_from_one() {
        let segments = assemble(vec![
            ("one".to_string(), 0.0, 1.0),
            ("two".to_string(), 1.0, 2.0),
            ("three".to_string(), 5.0, 6.0),
        ]);
        let ids: Vec<usize> = segments.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_segment_end_never_before_start() {
        let segment = TranscriptSegment::new(1, "x".to_string(), 5.0, 3.0);
        assert!(segment.end_time >= segment.start_time);
    }

    #[test]
    fn test_plain_text_and_duration() {
        let segments = assemble(vec![
            ("Hello".to_string(), 0.0, 1.5),
            ("world".to_string(), 1.5, 3.0),
        ]);
        assert_eq!(plain_text(&segments), "Hello world");
        assert_eq!(duration_seconds(&segments), 3.0);
    }
}
