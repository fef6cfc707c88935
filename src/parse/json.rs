use serde::Deserialize;

use super::RawCue;
use crate::TranscriptError;

#[derive(Debug, Deserialize)]
struct Json3Payload {
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs")]
    start_ms: Option<i64>,
    #[serde(rename = "dDurationMs")]
    duration_ms: Option<i64>,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(rename = "utf8", default)]
    text: String,
}

/// Extract raw cues from the structured JSON event stream
///
/// Events without text segments (window and styling events) are skipped, as
/// are events without a start offset.
pub(crate) fn extract_cues(body: &str) -> Result<Vec<RawCue>, TranscriptError> {
    let payload: Json3Payload = serde_json::from_str(body).map_err(|err| {
        TranscriptError::MalformedPayload(format!("invalid json3 payload: {err}"))
    })?;

    let mut cues = Vec::new();
    for event in payload.events {
        if event.segs.is_empty() {
            continue;
        }
        let Some(start_ms) = event.start_ms else {
            continue;
        };

        let text: String = event.segs.into_iter().map(|seg| seg.text).collect();
        cues.push(RawCue {
            start: start_ms as f64 / 1000.0,
            duration: event.duration_ms.unwrap_or(0) as f64 / 1000.0,
            text,
        });
    }

    Ok(cues)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_multi_segment_events() {
        let cues = extract_cues(
            r#"{"events":[{"tStartMs":1500,"dDurationMs":2500,"segs":[{"utf8":"Hello"},{"utf8":" world"}]}]}"#,
        )
        .unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start, 1.5);
        assert_eq!(cues[0].duration, 2.5);
        assert_eq!(cues[0].text, "Hello world");
    }

    #[test]
    fn skips_events_without_text_segments() {
        let cues = extract_cues(
            r#"{"events":[
                {"tStartMs":0,"dDurationMs":100},
                {"tStartMs":0,"dDurationMs":1000,"segs":[{"utf8":"spoken"}]}
            ]}"#,
        )
        .unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "spoken");
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = extract_cues("<transcript/>").unwrap_err();
        assert!(matches!(err, TranscriptError::MalformedPayload(_)));
    }

    #[test]
    fn missing_events_key_is_malformed() {
        assert!(extract_cues(r#"{"wireMagic":"pb3"}"#).is_err());
    }
}
