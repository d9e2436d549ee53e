//! Video identifier extraction from YouTube URL forms.

use regex::Regex;

/// Extract the canonical 11-character video identifier from a URL or bare id.
///
/// Tries the watch-query, short-link, embed, shorts and `/v/` forms in order.
/// Absence of a match is a normal outcome, not a fault.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    // Bare 11-character identifier
    if matches(r"^[A-Za-z0-9_-]{11}$", input).is_some() {
        return Some(input.to_string());
    }

    let patterns = [
        r"youtube\.com/watch\?.*v=([A-Za-z0-9_-]{11})",
        r"youtu\.be/([A-Za-z0-9_-]{11})",
        r"youtube\.com/embed/([A-Za-z0-9_-]{11})",
        r"youtube\.com/shorts/([A-Za-z0-9_-]{11})",
        r"youtube\.com/v/([A-Za-z0-9_-]{11})",
    ];

    patterns.iter().find_map(|pattern| matches(pattern, input))
}

fn matches(pattern: &str, input: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    let captures = re.captures(input)?;
    let capture = captures.get(1).or_else(|| captures.get(0))?;
    Some(capture.as_str().to_string())
}
