//! Caption payload parsers.
//!
//! Four input formats, one output shape. A parser that cannot interpret its
//! input returns an empty transcript so the orchestrator treats the source
//! as "found nothing" instead of failing the whole pipeline.

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::Deserialize;

use super::{assemble, TranscriptSegment};

/// Raw caption payload formats the adapters can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    /// Timed-text endpoint XML fragment
    TimedText,
    /// Caption-track XML from player metadata
    TrackXml,
    /// WebVTT subtitle file
    WebVtt,
    /// json3 event stream
    Json3,
}

/// Parse a raw caption body according to its format.
pub fn parse_captions(format: CaptionFormat, body: &str) -> Vec<TranscriptSegment> {
    match format {
        CaptionFormat::TimedText => parse_timedtext(body),
        CaptionFormat::TrackXml => parse_track_xml(body),
        CaptionFormat::WebVtt => parse_webvtt(body),
        CaptionFormat::Json3 => parse_json3(body),
    }
}

/// Parse timed-text XML via regex extraction of `<text start dur>` elements.
pub fn parse_timedtext(xml: &str) -> Vec<TranscriptSegment> {
    let re = match Regex::new(r#"(?s)<text start="([\d.]+)" dur="([\d.]+)"[^>]*>(.*?)</text>"#) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut entries = Vec::new();
    for captures in re.captures_iter(xml) {
        let start: f64 = match captures[1].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let dur: f64 = match captures[2].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let text = decode_entities(&captures[3]);
        entries.push((text, start, start + dur));
    }
    assemble(entries)
}

/// Default duration when a caption track element omits `dur`.
const DEFAULT_DURATION_SECS: f64 = 5.0;

/// Parse caption-track XML as a tree, iterating `<text>` elements.
pub fn parse_track_xml(xml: &str) -> Vec<TranscriptSegment> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut entries = Vec::new();
    let mut pending: Option<(f64, f64)> = None;
    let mut text_buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) if element.name().as_ref() == b"text" => {
                let mut start = 0.0;
                let mut dur = DEFAULT_DURATION_SECS;
                for attr in element.attributes().flatten() {
                    let value = match attr.unescape_value() {
                        Ok(v) => v,
                        Err(_) => continue,
                    };
                    match attr.key.as_ref() {
                        b"start" => start = value.parse().unwrap_or(0.0),
                        b"dur" => dur = value.parse().unwrap_or(DEFAULT_DURATION_SECS),
                        _ => {}
                    }
                }
                pending = Some((start, start + dur));
                text_buf.clear();
            }
            Ok(Event::Text(text)) => {
                if pending.is_some() {
                    if let Ok(unescaped) = text.unescape() {
                        text_buf.push_str(&unescaped);
                    }
                }
            }
            Ok(Event::End(element)) if element.name().as_ref() == b"text" => {
                if let Some((start, end)) = pending.take() {
                    let text = decode_entities(text_buf.trim());
                    if !text.is_empty() {
                        entries.push((text, start, end));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return Vec::new(),
            _ => {}
        }
    }
    assemble(entries)
}

/// Parse WebVTT by line scanning.
///
/// A `-->` line sets the pending cue times; the next non-empty, non-header,
/// non-timing, non-cue-number line is the caption text and closes the cue.
pub fn parse_webvtt(vtt: &str) -> Vec<TranscriptSegment> {
    let tag_re = Regex::new(r"<[^>]+>").ok();

    let mut entries = Vec::new();
    let mut pending: Option<(f64, f64)> = None;

    for line in vtt.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("WEBVTT")
            || line.starts_with("NOTE")
            || line.starts_with("STYLE")
            || line.starts_with("Kind:")
            || line.starts_with("Language:")
        {
            continue;
        }
        if line.contains("-->") {
            let mut halves = line.splitn(2, "-->");
            let start = halves.next().and_then(|s| parse_vtt_timestamp(s.trim()));
            // cue settings may follow the end timestamp
            let end = halves
                .next()
                .and_then(|s| s.trim().split_whitespace().next())
                .and_then(parse_vtt_timestamp);
            if let (Some(start), Some(end)) = (start, end) {
                pending = Some((start, end));
            }
            continue;
        }
        // numeric cue identifiers precede timing lines
        if line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if let Some((start, end)) = pending.take() {
            let stripped = match &tag_re {
                Some(re) => re.replace_all(line, "").to_string(),
                None => line.to_string(),
            };
            let text = decode_entities(stripped.trim());
            if !text.is_empty() {
                entries.push((text, start, end));
            }
        }
    }
    assemble(entries)
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds.
fn parse_vtt_timestamp(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<f64>().ok()?, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0.0, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Default duration when a json3 event omits `dDurationMs`.
const DEFAULT_DURATION_MS: f64 = 5000.0;

#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: f64,
    #[serde(rename = "dDurationMs")]
    duration_ms: Option<f64>,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    utf8: Option<String>,
}

/// Parse a json3 event stream.
pub fn parse_json3(json: &str) -> Vec<TranscriptSegment> {
    let document: Json3Document = match serde_json::from_str(json) {
        Ok(doc) => doc,
        Err(_) => return Vec::new(),
    };

    let mut entries = Vec::new();
    for event in document.events {
        let Some(segs) = event.segs else {
            continue;
        };
        let text: String = segs
            .iter()
            .filter_map(|seg| seg.utf8.as_deref())
            .collect();
        if text.is_empty() || text == "\n" {
            continue;
        }
        let start = event.start_ms / 1000.0;
        let end = start + event.duration_ms.unwrap_or(DEFAULT_DURATION_MS) / 1000.0;
        entries.push((decode_entities(text.trim()), start, end));
    }
    assemble(entries)
}

fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timedtext_decodes_entities() {
        let xml = r#"<text start="0" dur="5">Hello &amp; world</text>"#;
        let segments = parse_timedtext(xml);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Hello & world");
        assert_eq!(segments[0].start_time, 0.0);
        assert_eq!(segments[0].end_time, 5.0);
        assert_eq!(segments[0].id, 1);
    }

    #[test]
    fn test_timedtext_multiple_segments() {
        let xml = concat!(
            r#"<transcript><text start="0" dur="2">&quot;quoted&quot;</text>"#,
            r#"<text start="2.5" dur="1.5">it&#39;s &lt;b&gt;</text></transcript>"#,
        );
        let segments = parse_timedtext(xml);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "\"quoted\"");
        assert_eq!(segments[1].text, "it's <b>");
        assert_eq!(segments[1].start_time, 2.5);
        assert_eq!(segments[1].end_time, 4.0);
        let ids: Vec<usize> = segments.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_timedtext_garbage_yields_empty() {
        assert!(parse_timedtext("not xml at all").is_empty());
        assert!(parse_timedtext("").is_empty());
    }

    #[test]
    fn test_track_xml_defaults_duration() {
        let xml = r#"<transcript><text start="1.0">no duration</text></transcript>"#;
        let segments = parse_track_xml(xml);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_time, 1.0);
        assert_eq!(segments[0].end_time, 6.0);
    }

    #[test]
    fn test_track_xml_single_and_many() {
        let one = parse_track_xml(r#"<transcript><text start="0" dur="2">only</text></transcript>"#);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].text, "only");

        let many = parse_track_xml(concat!(
            r#"<transcript><text start="0" dur="2">first</text>"#,
            r#"<text start="2" dur="2">second &amp; third</text></transcript>"#,
        ));
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].text, "second & third");
    }

    #[test]
    fn test_track_xml_garbage_yields_empty() {
        assert!(parse_track_xml("{\"events\":[]}").is_empty());
    }

    #[test]
    fn test_webvtt_japanese_cue() {
        let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:03.000\nこんにちは\n";
        let segments = parse_webvtt(vtt);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_time, 1.0);
        assert_eq!(segments[0].end_time, 3.0);
        assert_eq!(segments[0].text, "こんにちは");
        assert_eq!(segments[0].words, vec!["こんにちは"]);
    }

    #[test]
    fn test_webvtt_short_timestamps_and_cue_numbers() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: en\n\n1\n01:02.500 --> 01:04.000\nhello there\n\n2\n00:01:05.000 --> 00:01:06.000 align:start\n<c>tagged</c> text\n";
        let segments = parse_webvtt(vtt);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_time, 62.5);
        assert_eq!(segments[0].end_time, 64.0);
        assert_eq!(segments[0].text, "hello there");
        assert_eq!(segments[1].start_time, 65.0);
        assert_eq!(segments[1].text, "tagged text");
    }

    #[test]
    fn test_webvtt_garbage_yields_empty() {
        assert!(parse_webvtt("random words\nwith no cues").is_empty());
    }

    #[test]
    fn test_json3_default_duration() {
        let json = r#"{"events":[{"segs":[{"utf8":"Hi"}],"tStartMs":1000}]}"#;
        let segments = parse_json3(json);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_time, 1.0);
        assert_eq!(segments[0].end_time, 6.0);
        assert_eq!(segments[0].text, "Hi");
    }

    #[test]
    fn test_json3_skips_empty_and_newline_events() {
        let json = r#"{"events":[
            {"tStartMs":0,"dDurationMs":1000},
            {"segs":[{"utf8":"\n"}],"tStartMs":500,"dDurationMs":1000},
            {"segs":[{"utf8":"keep "},{"utf8":"me"}],"tStartMs":1000,"dDurationMs":2000}
        ]}"#;
        let segments = parse_json3(json);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "keep me");
        assert_eq!(segments[0].start_time, 1.0);
        assert_eq!(segments[0].end_time, 3.0);
        assert_eq!(segments[0].id, 1);
    }

    #[test]
    fn test_json3_garbage_yields_empty() {
        assert!(parse_json3("<xml/>").is_empty());
    }

    #[test]
    fn test_all_parsers_keep_time_ordering_invariant() {
        let inputs = [
            parse_timedtext(r#"<text start="3" dur="1">a</text><text start="1" dur="1">b</text>"#),
            parse_json3(r#"{"events":[{"segs":[{"utf8":"a"}],"tStartMs":3000},{"segs":[{"utf8":"b"}],"tStartMs":1000}]}"#),
        ];
        for segments in inputs {
            // source order is trusted as-is, ids still contiguous
            for (index, segment) in segments.iter().enumerate() {
                assert_eq!(segment.id, index + 1);
                assert!(segment.end_time >= segment.start_time);
            }
        }
    }
}
