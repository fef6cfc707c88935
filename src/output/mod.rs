use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::pipeline::Transcript;

/// Save a transcript to file
pub async fn save_to_file(
    transcript: &Transcript,
    path: &Path,
    format: OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(transcript, format, include_timestamps)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print a transcript to console
pub fn print_to_console(
    transcript: &Transcript,
    format: OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(transcript, format, include_timestamps)?;
    println!("{}", content);
    Ok(())
}

fn render(transcript: &Transcript, format: OutputFormat, include_timestamps: bool) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format_as_text(transcript, include_timestamps),
        OutputFormat::Json => format_as_json(transcript)?,
        OutputFormat::Srt => format_as_srt(transcript),
        OutputFormat::Vtt => format_as_vtt(transcript),
    })
}

fn format_as_text(transcript: &Transcript, include_timestamps: bool) -> String {
    transcript
        .segments
        .iter()
        .map(|segment| {
            if include_timestamps {
                format!("[{}] {}", format_clock(segment.start), segment.text)
            } else {
                segment.text.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_as_json(transcript: &Transcript) -> Result<String> {
    let value = serde_json::json!({
        "videoId": transcript.video_id,
        "language": transcript.language,
        "retrievedAt": chrono::Utc::now(),
        "segments": transcript.segments,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn format_as_srt(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .zip(1..)
        .map(|(segment, index)| {
            format!(
                "{index}\n{} --> {}\n{}",
                format_timestamp(segment.start, ','),
                format_timestamp(segment.start + segment.duration, ','),
                segment.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_as_vtt(transcript: &Transcript) -> String {
    // WebVTT files begin with a mandatory header line followed by a blank line.
    let mut out = String::from("WEBVTT\n");
    for segment in &transcript.segments {
        out.push('\n');
        out.push_str(&format!(
            "{} --> {}\n{}\n",
            format_timestamp(segment.start, '.'),
            format_timestamp(segment.start + segment.duration, '.'),
            segment.text
        ));
    }
    out
}

/// Format seconds as `HH:MM:SS<sep>mmm`, rounding to the nearest millisecond
fn format_timestamp(seconds: f64, millis_sep: char) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;

    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let s = total_s % 60;
    let m = (total_s / 60) % 60;
    let h = total_s / 3600;

    format!("{h:02}:{m:02}:{s:02}{millis_sep}{ms:03}")
}

/// Format seconds as a short clock reading for text output
fn format_clock(seconds: f64) -> String {
    let total_s = seconds as u64;
    let s = total_s % 60;
    let m = (total_s / 60) % 60;
    let h = total_s / 3600;

    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VideoId;
    use crate::pipeline::TranscriptSegment;

    fn transcript() -> Transcript {
        Transcript {
            video_id: VideoId::parse("dQw4w9WgXcQ").unwrap(),
            language: "en".to_string(),
            segments: vec![
                TranscriptSegment {
                    start: 0.0,
                    duration: 2.0,
                    text: "Hello world.".to_string(),
                },
                TranscriptSegment {
                    start: 61.2,
                    duration: 0.8,
                    text: "How are you?".to_string(),
                },
            ],
        }
    }

    #[test]
    fn text_without_timestamps_is_bare_lines() {
        let text = format_as_text(&transcript(), false);
        assert_eq!(text, "Hello world.\nHow are you?");
    }

    #[test]
    fn text_with_timestamps_prefixes_a_clock() {
        let text = format_as_text(&transcript(), true);
        assert_eq!(text, "[0:00] Hello world.\n[1:01] How are you?");
    }

    #[test]
    fn json_carries_the_wire_fields() {
        let json = format_as_json(&transcript()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["videoId"], "dQw4w9WgXcQ");
        assert_eq!(value["language"], "en");
        assert!(value["retrievedAt"].is_string());
        assert_eq!(value["segments"][0]["start"], 0.0);
        assert_eq!(value["segments"][0]["duration"], 2.0);
        assert_eq!(value["segments"][0]["text"], "Hello world.");
    }

    #[test]
    fn srt_numbers_cues_and_uses_comma_millis() {
        let srt = format_as_srt(&transcript());
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,000\nHello world."));
        assert!(srt.contains("2\n00:01:01,200 --> 00:01:02,000\nHow are you?"));
    }

    #[test]
    fn vtt_writes_the_header_once_and_dot_millis() {
        let vtt = format_as_vtt(&transcript());
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:02.000\nHello world.\n"));
        assert!(vtt.contains("00:01:01.200 --> 00:01:02.000\nHow are you?\n"));
        assert_eq!(vtt.matches("WEBVTT").count(), 1);
    }

    #[test]
    fn timestamps_round_to_the_nearest_millisecond() {
        assert_eq!(format_timestamp(0.0004, '.'), "00:00:00.000");
        assert_eq!(format_timestamp(1.9995, '.'), "00:00:02.000");
        assert_eq!(format_timestamp(3661.5, ','), "01:01:01,500");
    }
}
