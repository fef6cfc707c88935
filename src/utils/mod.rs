use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// Extract a video id from any of the common YouTube URL shapes
///
/// Accepts a bare 11-character id, `youtube.com/watch?v=ID`, `youtu.be/ID`,
/// and the `/embed/ID`, `/shorts/ID`, `/live/ID` path forms. Returns `None`
/// when the input carries no recognizable id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    if BARE_ID.is_match(input) {
        return Some(input.to_string());
    }

    let url = Url::parse(input).ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let candidate = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            if url.path() == "/watch" {
                url.query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned())
            } else {
                let mut segments = url.path_segments()?;
                match segments.next() {
                    Some("embed") | Some("shorts") | Some("live") => {
                        segments.next().map(str::to_string)
                    }
                    _ => None,
                }
            }
        }
        _ => None,
    }?;

    BARE_ID.is_match(&candidate).then_some(candidate)
}

/// Normalize a language tag for comparison
///
/// Trims and lowercases; no base-language widening ("en" does not match
/// "en-GB", since a preference list carries its own fallbacks).
pub fn normalize_language_tag(tag: &str) -> String {
    tag.trim().to_ascii_lowercase()
}

/// Normalize a preference list into the canonical cache-key form
///
/// Tags are trimmed, lowercased, and deduplicated in order; an empty result
/// falls back to the configured default list.
pub fn normalize_language_list(preferred: &[String], default: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(preferred.len());
    for tag in preferred {
        let tag = normalize_language_tag(tag);
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }

    if normalized.is_empty() && !default.is_empty() {
        return normalize_language_list(default, &[]);
    }
    normalized
}
