use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, TranscriptCache};
use crate::catalog::selector::select_track;
use crate::catalog::youtube::YoutubeResolver;
use crate::catalog::{TrackCatalog, TrackResolver, VideoId};
use crate::config::Config;
use crate::fetch::limiter::RateLimiter;
use crate::fetch::{CaptionFetcher, HttpCaptionFetcher};
use crate::parse;
use crate::utils::normalize_language_list;
use crate::TranscriptError;

/// One timed caption segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Offset from the start of the video, in seconds
    pub start: f64,

    /// Segment length in seconds
    pub duration: f64,

    /// Normalized caption text, never empty
    pub text: String,
}

/// A complete transcript for one video in one language
///
/// Immutable once constructed; this is the unit of caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub video_id: VideoId,

    /// Language code of the selected caption track
    pub language: String,

    /// Segments ordered by non-decreasing start offset
    pub segments: Vec<TranscriptSegment>,
}

/// The transcript retrieval pipeline
///
/// Composes resolver, selector, fetcher, and parser behind the single-flight
/// cache. This is the sole entry point callers use; every error kind from the
/// stages underneath propagates unchanged.
pub struct TranscriptPipeline {
    resolver: Arc<dyn TrackResolver>,
    fetcher: Arc<dyn CaptionFetcher>,
    cache: Arc<TranscriptCache>,
    default_languages: Vec<String>,
    overall_timeout: Duration,
}

impl TranscriptPipeline {
    /// Wire the production pipeline from configuration
    pub fn new(config: &Config) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.upstream.user_agent)
            .build()
            .context("Failed to build HTTP client")?;

        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.per_second,
            config.rate_limit.burst,
            config.rate_limit_max_wait(),
        ));

        let resolver = Arc::new(YoutubeResolver::new(
            client.clone(),
            &config.upstream,
            config.retry_policy(),
            config.attempt_timeout(),
        ));

        let fetcher = Arc::new(HttpCaptionFetcher::new(
            client,
            limiter,
            config.retry_policy(),
            config.caption_format()?,
            config.attempt_timeout(),
        ));

        Ok(Self::with_components(
            resolver,
            fetcher,
            Arc::new(TranscriptCache::new(config.cache_ttl())),
            config.languages.preferred.clone(),
            config.overall_timeout(),
        ))
    }

    /// Assemble a pipeline from injected components
    ///
    /// Tests substitute deterministic resolver and fetcher fakes here.
    pub fn with_components(
        resolver: Arc<dyn TrackResolver>,
        fetcher: Arc<dyn CaptionFetcher>,
        cache: Arc<TranscriptCache>,
        default_languages: Vec<String>,
        overall_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            cache,
            default_languages,
            overall_timeout,
        }
    }

    /// Retrieve the transcript for a video under a language preference list
    ///
    /// An empty preference list falls back to the configured default. The
    /// overall deadline bounds this caller's wait only; a shared in-flight
    /// computation keeps running for the other waiters on the same key.
    pub async fn get_transcript(
        &self,
        video: &VideoId,
        preferred: &[String],
    ) -> Result<Transcript, TranscriptError> {
        let languages = normalize_language_list(preferred, &self.default_languages);
        let key = CacheKey::new(video.clone(), languages.clone());

        let resolver = Arc::clone(&self.resolver);
        let fetcher = Arc::clone(&self.fetcher);
        let video = video.clone();
        let lookup = self
            .cache
            .get_or_compute(key, move || {
                compute_transcript(resolver, fetcher, video, languages)
            });

        match tokio::time::timeout(self.overall_timeout, lookup).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TranscriptError::UpstreamUnavailable(format!(
                "transcript retrieval did not finish within {:?}",
                self.overall_timeout
            ))),
        }
    }

    /// List the caption catalog of a video without fetching anything
    ///
    /// Resolver passthrough; catalogs are not cached.
    pub async fn list_tracks(&self, video: &VideoId) -> Result<TrackCatalog, TranscriptError> {
        self.resolver.resolve(video).await
    }
}

/// The full resolve → select → fetch → parse chain for one cache key
async fn compute_transcript(
    resolver: Arc<dyn TrackResolver>,
    fetcher: Arc<dyn CaptionFetcher>,
    video: VideoId,
    languages: Vec<String>,
) -> Result<Transcript, TranscriptError> {
    let catalog = resolver.resolve(&video).await?;
    let track = select_track(&catalog, &languages)?;
    tracing::info!(
        video = %video,
        language = %track.language,
        kind = track.kind.as_str(),
        "selected caption track"
    );

    let payload = fetcher.fetch(&track).await?;
    let segments = parse::parse(&payload)?;
    tracing::debug!(video = %video, segments = segments.len(), "parsed transcript");

    Ok(Transcript {
        video_id: video,
        language: track.language,
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CaptionTrack, MockTrackResolver, TrackKind};
    use crate::fetch::{MockCaptionFetcher, PayloadFormat, RawCaptionPayload};
    use async_trait::async_trait;

    fn video() -> VideoId {
        VideoId::parse("abc123XYZ_-").unwrap()
    }

    fn en_track() -> CaptionTrack {
        CaptionTrack {
            language: "en".to_string(),
            name: "English".to_string(),
            kind: TrackKind::Manual,
            base_url: "https://example.com/api/timedtext?v=abc123XYZ_-&lang=en".to_string(),
        }
    }

    fn two_cue_payload() -> RawCaptionPayload {
        RawCaptionPayload {
            format: PayloadFormat::TimedTextXml,
            body: r#"<transcript>
                <text start="0" dur="2">Hi</text>
                <text start="2" dur="3">there</text>
            </transcript>"#
                .to_string(),
        }
    }

    fn pipeline(
        resolver: MockTrackResolver,
        fetcher: MockCaptionFetcher,
    ) -> TranscriptPipeline {
        TranscriptPipeline::with_components(
            Arc::new(resolver),
            Arc::new(fetcher),
            Arc::new(TranscriptCache::new(Duration::from_secs(300))),
            vec!["en".to_string()],
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn retrieves_a_transcript_end_to_end() {
        let mut resolver = MockTrackResolver::new();
        resolver.expect_resolve().times(1).returning(|video| {
            Ok(TrackCatalog {
                video_id: video.clone(),
                tracks: vec![en_track()],
            })
        });

        let mut fetcher = MockCaptionFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(two_cue_payload()));

        let transcript = pipeline(resolver, fetcher)
            .get_transcript(&video(), &["en".to_string()])
            .await
            .unwrap();

        assert_eq!(transcript.video_id, video());
        assert_eq!(transcript.language, "en");
        assert_eq!(
            transcript.segments,
            vec![
                TranscriptSegment {
                    start: 0.0,
                    duration: 2.0,
                    text: "Hi".to_string(),
                },
                TranscriptSegment {
                    start: 2.0,
                    duration: 3.0,
                    text: "there".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let mut resolver = MockTrackResolver::new();
        resolver.expect_resolve().times(1).returning(|video| {
            Ok(TrackCatalog {
                video_id: video.clone(),
                tracks: vec![en_track()],
            })
        });

        let mut fetcher = MockCaptionFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(two_cue_payload()));

        let pipeline = pipeline(resolver, fetcher);
        let first = pipeline
            .get_transcript(&video(), &["en".to_string()])
            .await
            .unwrap();
        let second = pipeline
            .get_transcript(&video(), &["en".to_string()])
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn equivalent_preference_lists_share_a_cache_key() {
        let mut resolver = MockTrackResolver::new();
        resolver.expect_resolve().times(1).returning(|video| {
            Ok(TrackCatalog {
                video_id: video.clone(),
                tracks: vec![en_track()],
            })
        });

        let mut fetcher = MockCaptionFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(two_cue_payload()));

        let pipeline = pipeline(resolver, fetcher);
        pipeline
            .get_transcript(&video(), &["EN".to_string()])
            .await
            .unwrap();
        // Same key after normalization, and the empty list falls back to the
        // default ["en"].
        pipeline
            .get_transcript(&video(), &[" en ".to_string()])
            .await
            .unwrap();
        pipeline.get_transcript(&video(), &[]).await.unwrap();
    }

    #[tokio::test]
    async fn not_found_from_the_resolver_propagates() {
        let mut resolver = MockTrackResolver::new();
        resolver
            .expect_resolve()
            .returning(|_| Err(TranscriptError::NotFound("no such video".to_string())));

        let fetcher = MockCaptionFetcher::new();

        let err = pipeline(resolver, fetcher)
            .get_transcript(&video(), &["en".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_catalog_surfaces_no_matching_track() {
        let mut resolver = MockTrackResolver::new();
        resolver.expect_resolve().returning(|video| {
            Ok(TrackCatalog {
                video_id: video.clone(),
                tracks: vec![],
            })
        });

        let fetcher = MockCaptionFetcher::new();

        let err = pipeline(resolver, fetcher)
            .get_transcript(&video(), &["en".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptError::NoMatchingTrack(_)));
    }

    #[tokio::test]
    async fn rate_limit_failures_propagate() {
        let mut resolver = MockTrackResolver::new();
        resolver.expect_resolve().returning(|video| {
            Ok(TrackCatalog {
                video_id: video.clone(),
                tracks: vec![en_track()],
            })
        });

        let mut fetcher = MockCaptionFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Err(TranscriptError::RateLimited("throttled".to_string())));

        let err = pipeline(resolver, fetcher)
            .get_transcript(&video(), &["en".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptError::RateLimited(_)));
    }

    #[tokio::test]
    async fn malformed_payloads_propagate() {
        let mut resolver = MockTrackResolver::new();
        resolver.expect_resolve().returning(|video| {
            Ok(TrackCatalog {
                video_id: video.clone(),
                tracks: vec![en_track()],
            })
        });

        let mut fetcher = MockCaptionFetcher::new();
        fetcher.expect_fetch().returning(|_| {
            Ok(RawCaptionPayload {
                format: PayloadFormat::Json3,
                body: "not json at all".to_string(),
            })
        });

        let err = pipeline(resolver, fetcher)
            .get_transcript(&video(), &["en".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptError::MalformedPayload(_)));
    }

    struct StallingResolver;

    #[async_trait]
    impl TrackResolver for StallingResolver {
        async fn resolve(&self, _video: &VideoId) -> Result<TrackCatalog, TranscriptError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(TranscriptError::UpstreamUnavailable("unreachable".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overall_deadline_bounds_the_wait() {
        let pipeline = TranscriptPipeline::with_components(
            Arc::new(StallingResolver),
            Arc::new(MockCaptionFetcher::new()),
            Arc::new(TranscriptCache::new(Duration::from_secs(300))),
            vec!["en".to_string()],
            Duration::from_secs(30),
        );

        let err = pipeline
            .get_transcript(&video(), &["en".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn lists_tracks_without_fetching() {
        let mut resolver = MockTrackResolver::new();
        resolver.expect_resolve().times(1).returning(|video| {
            Ok(TrackCatalog {
                video_id: video.clone(),
                tracks: vec![en_track()],
            })
        });

        let fetcher = MockCaptionFetcher::new();

        let catalog = pipeline(resolver, fetcher)
            .list_tracks(&video())
            .await
            .unwrap();
        assert_eq!(catalog.tracks.len(), 1);
    }
}
