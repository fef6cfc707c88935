use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{CaptionTrack, TrackCatalog, TrackKind, TrackResolver, VideoId};
use crate::config::UpstreamConfig;
use crate::fetch::retry::{FetchFailure, RetryPolicy};
use crate::TranscriptError;

/// Resolves caption catalogs from the YouTube player metadata endpoint
///
/// The exact endpoint shape is an implementation detail of this resolver;
/// the base URL is configurable so tests and proxies can point elsewhere.
pub struct YoutubeResolver {
    client: Client,
    player_url: String,
    client_name: String,
    client_version: String,
    retry: RetryPolicy,
    attempt_timeout: Duration,
}

impl YoutubeResolver {
    pub fn new(
        client: Client,
        upstream: &UpstreamConfig,
        retry: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            client,
            player_url: upstream.player_url.clone(),
            client_name: upstream.client_name.clone(),
            client_version: upstream.client_version.clone(),
            retry,
            attempt_timeout,
        }
    }

    /// Issue one player metadata request and classify the failure mode
    async fn request_player(
        client: Client,
        player_url: String,
        client_name: String,
        client_version: String,
        video: VideoId,
        timeout: Duration,
    ) -> Result<String, FetchFailure> {
        let body = json!({
            "context": {
                "client": {
                    "clientName": client_name,
                    "clientVersion": client_version,
                }
            },
            "videoId": video.as_str(),
        });

        let response = match client
            .post(&player_url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                return Err(FetchFailure::Transient(format!(
                    "player request failed: {err}"
                )))
            }
        };

        match response.status() {
            status if status.is_success() => response.text().await.map_err(|err| {
                FetchFailure::Transient(format!("player response truncated: {err}"))
            }),
            StatusCode::NOT_FOUND => Err(FetchFailure::Fatal(TranscriptError::NotFound(
                format!("video {video} does not exist"),
            ))),
            StatusCode::TOO_MANY_REQUESTS => Err(FetchFailure::Fatal(
                TranscriptError::RateLimited("upstream throttled the catalog request".to_string()),
            )),
            status if status.is_server_error() => Err(FetchFailure::Transient(format!(
                "player endpoint returned HTTP {status}"
            ))),
            status => Err(FetchFailure::Fatal(TranscriptError::UpstreamUnavailable(
                format!("player endpoint rejected the request: HTTP {status}"),
            ))),
        }
    }
}

#[async_trait]
impl TrackResolver for YoutubeResolver {
    async fn resolve(&self, video: &VideoId) -> Result<TrackCatalog, TranscriptError> {
        tracing::debug!(video = %video, "resolving caption catalog");

        let client = self.client.clone();
        let player_url = self.player_url.clone();
        let client_name = self.client_name.clone();
        let client_version = self.client_version.clone();
        let request_video = video.clone();
        let timeout = self.attempt_timeout;

        let body = self
            .retry
            .run(move |_attempt| {
                Self::request_player(
                    client.clone(),
                    player_url.clone(),
                    client_name.clone(),
                    client_version.clone(),
                    request_video.clone(),
                    timeout,
                )
            })
            .await?;

        let catalog = catalog_from_response(video.clone(), &body)?;
        tracing::debug!(
            video = %catalog.video_id,
            tracks = catalog.tracks.len(),
            "resolved caption catalog"
        );
        Ok(catalog)
    }
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    tracklist: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct TracklistRenderer {
    #[serde(rename = "captionTracks", default)]
    caption_tracks: Vec<RawCaptionTrack>,
}

#[derive(Debug, Deserialize)]
struct RawCaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackName {
    #[serde(rename = "simpleText")]
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TrackNameRun>,
}

#[derive(Debug, Deserialize)]
struct TrackNameRun {
    text: String,
}

/// Decode a player metadata response into a catalog
///
/// Pure so the mapping is testable on fixtures. An unplayable video or an
/// absent captions section is NotFound, while a present-but-empty track list
/// is a valid empty catalog.
fn catalog_from_response(video_id: VideoId, body: &str) -> Result<TrackCatalog, TranscriptError> {
    let response: PlayerResponse = serde_json::from_str(body).map_err(|err| {
        TranscriptError::UpstreamUnavailable(format!("unexpected player response: {err}"))
    })?;

    if let Some(playability) = &response.playability_status {
        match playability.status.as_deref() {
            Some("OK") | None => {}
            Some(_) => {
                let reason = playability
                    .reason
                    .clone()
                    .unwrap_or_else(|| "video is unavailable".to_string());
                return Err(TranscriptError::NotFound(format!(
                    "video {video_id}: {reason}"
                )));
            }
        }
    }

    let tracklist = response
        .captions
        .and_then(|captions| captions.tracklist)
        .ok_or_else(|| {
            TranscriptError::NotFound(format!("captions are disabled for video {video_id}"))
        })?;

    let tracks = tracklist
        .caption_tracks
        .into_iter()
        .map(|raw| {
            let kind = match raw.kind.as_deref() {
                Some("asr") => TrackKind::AutoGenerated,
                _ => TrackKind::Manual,
            };
            let name = raw
                .name
                .and_then(|name| {
                    name.simple_text.or_else(|| {
                        let joined = name
                            .runs
                            .into_iter()
                            .map(|run| run.text)
                            .collect::<Vec<_>>()
                            .join("");
                        (!joined.is_empty()).then_some(joined)
                    })
                })
                .unwrap_or_else(|| raw.language_code.clone());

            CaptionTrack {
                language: raw.language_code,
                name,
                kind,
                base_url: raw.base_url,
            }
        })
        .collect();

    Ok(TrackCatalog { video_id, tracks })
}
