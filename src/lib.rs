//! ytt - YouTube transcript retrieval pipeline
//!
//! This library discovers the caption tracks available for a video, selects
//! the best track for a language preference list, fetches and parses the raw
//! caption payload, and caches completed transcripts with single-flight
//! deduplication of concurrent requests.

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod utils;

pub use catalog::{CaptionTrack, TrackCatalog, TrackKind, VideoId};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use pipeline::{Transcript, TranscriptPipeline, TranscriptSegment};

/// Result type used by the CLI and configuration plumbing
pub type Result<T> = anyhow::Result<T>;

/// Error taxonomy for the transcript pipeline
///
/// Failures propagate through the cache coordinator and the orchestrator
/// unchanged so that callers can map each kind to a distinct response.
/// `Clone` because the single-flight coordinator hands one failure to every
/// waiter on the same key.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    /// Video does not exist, or captions are disabled for it entirely
    #[error("video not found: {0}")]
    NotFound(String),

    /// The selection policy found no usable caption track
    #[error("no matching caption track: {0}")]
    NoMatchingTrack(String),

    /// Local limiter or upstream throttling; the caller may retry later
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Transport or service failure, already retried internally
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Caption payload could not be parsed or violated timing invariants
    #[error("malformed caption payload: {0}")]
    MalformedPayload(String),
}
