use anyhow::Result;
use std::fmt::Write;

use crate::pipeline::ExtractionResult;
use crate::transcript::{duration_seconds, plain_text};
use crate::utils::format_duration;

/// Render as plain text, optionally prefixing each segment with its start time.
pub fn format_as_text(result: &ExtractionResult, include_timestamps: bool) -> String {
    if !include_timestamps {
        return plain_text(&result.transcript);
    }

    let mut output = String::new();
    for segment in &result.transcript {
        let _ = writeln!(
            output,
            "[{}] {}",
            clock_timestamp(segment.start_time),
            segment.text
        );
    }
    let _ = writeln!(
        output,
        "\n# {} segments, {}",
        result.transcript.len(),
        format_duration(duration_seconds(&result.transcript))
    );
    output
}

/// Render the full extraction result as pretty JSON.
pub fn format_as_json(result: &ExtractionResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Render as SRT subtitles.
pub fn format_as_srt(result: &ExtractionResult) -> String {
    let mut output = String::new();
    for segment in &result.transcript {
        let _ = writeln!(output, "{}", segment.id);
        let _ = writeln!(
            output,
            "{} --> {}",
            srt_timestamp(segment.start_time),
            srt_timestamp(segment.end_time)
        );
        let _ = writeln!(output, "{}\n", segment.text);
    }
    output
}

/// Render as WebVTT.
pub fn format_as_vtt(result: &ExtractionResult) -> String {
    let mut output = String::from("WEBVTT\n\n");
    for segment in &result.transcript {
        let _ = writeln!(
            output,
            "{} --> {}",
            vtt_timestamp(segment.start_time),
            vtt_timestamp(segment.end_time)
        );
        let _ = writeln!(output, "{}\n", segment.text);
    }
    output
}

/// Render as CSV with one row per segment.
pub fn format_as_csv(result: &ExtractionResult) -> String {
    let mut output = String::from("id,start_time,end_time,text\n");
    for segment in &result.transcript {
        let escaped = segment.text.replace('"', "\"\"");
        let _ = writeln!(
            output,
            "{},{:.3},{:.3},\"{}\"",
            segment.id, segment.start_time, segment.end_time, escaped
        );
    }
    output
}

fn split_seconds(seconds: f64) -> (u64, u64, u64, u64) {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let secs = (millis % 60_000) / 1000;
    (hours, minutes, secs, millis % 1000)
}

fn srt_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_seconds(seconds);
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

fn vtt_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_seconds(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

fn clock_timestamp(seconds: f64) -> String {
    let (h, m, s, _) = split_seconds(seconds);
    format!("{:02}:{:02}:{:02}", h, m, s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ExtractionResult;
    use crate::transcript::assemble;

    fn sample_result() -> ExtractionResult {
        ExtractionResult::from_transcription(
            assemble(vec![
                ("Hello \"world\"".to_string(), 0.0, 2.5),
                ("second line".to_string(), 2.5, 65.25),
            ]),
            "en".to_string(),
        )
    }

    #[test]
    fn test_text_plain_and_timestamped() {
        let result = sample_result();
        assert_eq!(format_as_text(&result, false), "Hello \"world\" second line");

        let timestamped = format_as_text(&result, true);
        assert!(timestamped.contains("[00:00:00] Hello \"world\""));
        assert!(timestamped.contains("[00:00:02] second line"));
        assert!(timestamped.contains("2 segments"));
    }

    #[test]
    fn test_srt_output() {
        let srt = format_as_srt(&sample_result());
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,500\nHello \"world\""));
        assert!(srt.contains("2\n00:00:02,500 --> 00:01:05,250\nsecond line"));
    }

    #[test]
    fn test_vtt_output() {
        let vtt = format_as_vtt(&sample_result());
        assert!(vtt.starts_with("WEBVTT\n"));
        assert!(vtt.contains("00:00:02.500 --> 00:01:05.250"));
        // a VTT we emit should be one our own parser understands
        let reparsed = crate::transcript::parse::parse_webvtt(&vtt);
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[1].start_time, 2.5);
    }

    #[test]
    fn test_csv_escapes_quotes() {
        let csv = format_as_csv(&sample_result());
        assert!(csv.starts_with("id,start_time,end_time,text\n"));
        assert!(csv.contains("1,0.000,2.500,\"Hello \"\"world\"\"\""));
    }

    #[test]
    fn test_json_is_camel_case() {
        let json = format_as_json(&sample_result()).unwrap();
        assert!(json.contains("\"isAutoGenerated\""));
        assert!(json.contains("\"audioExtractionAvailable\""));
        assert!(json.contains("\"startTime\""));
        assert!(json.contains("\"audio-transcription\""));
    }
}
