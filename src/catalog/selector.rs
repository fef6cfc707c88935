use super::{CaptionTrack, TrackCatalog, TrackKind};
use crate::utils::normalize_language_tag;
use crate::TranscriptError;

/// Choose the single best track for a language preference list
///
/// Deterministic and pure. Preferred languages are walked in order; within a
/// language a manual track beats an auto-generated one. When nothing in the
/// preference list matches, the first manual track in catalog order wins,
/// else the first auto-generated one. Ties keep catalog order.
pub fn select_track(
    catalog: &TrackCatalog,
    preferred: &[String],
) -> Result<CaptionTrack, TranscriptError> {
    if catalog.tracks.is_empty() {
        return Err(TranscriptError::NoMatchingTrack(format!(
            "video {} has no caption tracks",
            catalog.video_id
        )));
    }

    for language in preferred {
        let want = normalize_language_tag(language);
        let mut auto_match: Option<&CaptionTrack> = None;

        for track in &catalog.tracks {
            if normalize_language_tag(&track.language) != want {
                continue;
            }
            match track.kind {
                TrackKind::Manual => return Ok(track.clone()),
                TrackKind::AutoGenerated => auto_match = auto_match.or(Some(track)),
            }
        }

        if let Some(track) = auto_match {
            return Ok(track.clone());
        }
    }

    let fallback = catalog
        .tracks
        .iter()
        .find(|track| track.kind == TrackKind::Manual)
        .unwrap_or(&catalog.tracks[0]);

    Ok(fallback.clone())
}
