use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod selector;
pub mod youtube;

use crate::TranscriptError;

/// Validated YouTube video identifier
///
/// An eleven character token over `[A-Za-z0-9_-]`. Syntax is checked once at
/// the boundary; the pipeline treats an accepted id as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub const LEN: usize = 11;

    /// Parse an identifier, enforcing the fixed-length token shape
    pub fn parse(raw: &str) -> Result<Self, TranscriptError> {
        let raw = raw.trim();
        let valid = raw.len() == Self::LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(TranscriptError::NotFound(format!(
                "invalid video id: {raw}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authorship kind of a caption track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackKind {
    /// Human-authored captions
    Manual,
    /// Machine-generated captions
    AutoGenerated,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Manual => "manual",
            TrackKind::AutoGenerated => "auto-generated",
        }
    }
}

/// One available caption track for a video
///
/// Produced by a [`TrackResolver`]; read-only thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Language code as reported by the upstream (e.g. "en", "pt-BR")
    pub language: String,

    /// Human-readable track name
    pub name: String,

    /// Manual or auto-generated
    pub kind: TrackKind,

    /// Source locator the fetcher retrieves the payload from
    pub base_url: String,
}

/// The ordered caption catalog of one video
///
/// May be empty: a video with zero caption tracks is a valid, non-error
/// state, distinct from a video whose captions are disabled (NotFound).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackCatalog {
    pub video_id: VideoId,
    pub tracks: Vec<CaptionTrack>,
}

impl TrackCatalog {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Trait for resolving the caption catalog of a video
///
/// Implementations perform the upstream network call only; catalogs are not
/// cached (caching happens at the transcript level, where the expensive
/// fetch+parse work lives).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Retrieve the list of available caption tracks for a video
    async fn resolve(&self, video: &VideoId) -> Result<TrackCatalog, TranscriptError>;
}
