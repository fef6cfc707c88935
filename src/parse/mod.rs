use once_cell::sync::Lazy;
use regex::Regex;

pub mod json;
pub mod timedtext;

use crate::fetch::{PayloadFormat, RawCaptionPayload};
use crate::pipeline::TranscriptSegment;
use crate::TranscriptError;

/// A cue as it appears in the raw payload, before normalization
#[derive(Debug, Clone)]
pub(crate) struct RawCue {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(x?[0-9a-fA-F]+);").unwrap());

/// Parse a raw caption payload into normalized transcript segments
///
/// Dispatch is on the declared format tag only. A payload that cannot be
/// decoded, or whose cue timing is inconsistent after normalization, fails
/// with `MalformedPayload`; a partial transcript is never returned.
pub fn parse(payload: &RawCaptionPayload) -> Result<Vec<TranscriptSegment>, TranscriptError> {
    let cues = match payload.format {
        PayloadFormat::TimedTextXml => timedtext::extract_cues(&payload.body)?,
        PayloadFormat::Json3 => json::extract_cues(&payload.body)?,
    };
    normalize(cues)
}

/// Apply the shared normalization rules and enforce timing invariants
///
/// Rules: clean each cue's text, drop cues that end up empty, merge
/// consecutive cues sharing a start offset, and require the remaining starts
/// to be non-decreasing with non-negative durations.
fn normalize(cues: Vec<RawCue>) -> Result<Vec<TranscriptSegment>, TranscriptError> {
    let mut segments: Vec<TranscriptSegment> = Vec::with_capacity(cues.len());

    for cue in cues {
        if cue.duration < 0.0 {
            return Err(TranscriptError::MalformedPayload(format!(
                "cue at {:.3}s has a negative duration",
                cue.start
            )));
        }

        let text = clean_text(&cue.text);
        if text.is_empty() {
            continue;
        }

        if let Some(last) = segments.last_mut() {
            if cue.start == last.start {
                // Duplicate cue: concatenate, keep the longer span.
                last.text.push(' ');
                last.text.push_str(&text);
                last.duration = last.duration.max(cue.duration);
                continue;
            }
            if cue.start < last.start {
                return Err(TranscriptError::MalformedPayload(format!(
                    "cue starts go backwards at {:.3}s",
                    cue.start
                )));
            }
        }

        segments.push(TranscriptSegment {
            start: cue.start,
            duration: cue.duration,
            text,
        });
    }

    Ok(segments)
}

/// Strip embedded markup, decode entity escapes, collapse whitespace
fn clean_text(raw: &str) -> String {
    let stripped = MARKUP_TAG.replace_all(raw, " ");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let code = &caps[1];
        let parsed = if let Some(hex) = code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()
        } else {
            code.parse::<u32>().ok()
        };
        parsed
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    // &amp; goes last so already-decoded ampersands are not re-expanded.
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
