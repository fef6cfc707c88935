use once_cell::sync::Lazy;
use regex::Regex;

use super::RawCue;
use crate::TranscriptError;

static CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<text\b([^>]*)>(.*?)</text>").unwrap());
static START_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"start="([^"]*)""#).unwrap());
static DUR_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"dur="([^"]*)""#).unwrap());

/// Extract raw cues from legacy `<text start=".." dur="..">` markup
///
/// `dur` may be absent (zero-length cue); `start` may not.
pub(crate) fn extract_cues(body: &str) -> Result<Vec<RawCue>, TranscriptError> {
    if !body.contains("<transcript") && !body.contains("<text") {
        return Err(TranscriptError::MalformedPayload(
            "payload is not timed-text markup".to_string(),
        ));
    }

    let mut cues = Vec::new();
    for caps in CUE.captures_iter(body) {
        let attrs = &caps[1];

        let start = START_ATTR
            .captures(attrs)
            .and_then(|c| c[1].parse::<f64>().ok())
            .ok_or_else(|| {
                TranscriptError::MalformedPayload("cue is missing a start offset".to_string())
            })?;

        let duration = match DUR_ATTR.captures(attrs) {
            Some(c) => c[1].parse::<f64>().map_err(|_| {
                TranscriptError::MalformedPayload(format!(
                    "unparseable cue duration at {start}s"
                ))
            })?,
            None => 0.0,
        };

        cues.push(RawCue {
            start,
            duration,
            text: caps[2].to_string(),
        });
    }

    if cues.is_empty() && body.contains("<text") {
        return Err(TranscriptError::MalformedPayload(
            "cue markup is unterminated".to_string(),
        ));
    }

    Ok(cues)
}
