use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub mod limiter;
pub mod retry;

use crate::catalog::CaptionTrack;
use crate::TranscriptError;
use limiter::RateLimiter;
use retry::{FetchFailure, RetryPolicy};

/// Known caption payload encodings
///
/// A closed set: supporting another encoding means adding a variant here and
/// a matching parser arm, checked at compile time. The tag is declared by the
/// fetcher from the request it made, never sniffed from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadFormat {
    /// Legacy timed-text markup (`<text start=".." dur="..">`)
    #[serde(rename = "xml")]
    TimedTextXml,
    /// Structured JSON event stream
    #[serde(rename = "json3")]
    Json3,
}

impl PayloadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadFormat::TimedTextXml => "xml",
            PayloadFormat::Json3 => "json3",
        }
    }

    /// Value for the upstream `fmt` query parameter, if one is needed
    fn query_value(&self) -> Option<&'static str> {
        match self {
            PayloadFormat::TimedTextXml => None,
            PayloadFormat::Json3 => Some("json3"),
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "xml" => Ok(PayloadFormat::TimedTextXml),
            "json3" => Ok(PayloadFormat::Json3),
            other => Err(anyhow::anyhow!("unknown caption format: {other}")),
        }
    }
}

/// Raw caption payload handed from the fetcher to the parser
///
/// Transient: owned by the fetch→parse handoff and dropped after parsing.
#[derive(Debug, Clone)]
pub struct RawCaptionPayload {
    pub format: PayloadFormat,
    pub body: String,
}

/// Trait for fetching the raw caption payload of a selected track
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionFetcher: Send + Sync {
    async fn fetch(&self, track: &CaptionTrack) -> Result<RawCaptionPayload, TranscriptError>;
}

/// HTTP fetcher with rate limiting, retries, and per-attempt timeouts
///
/// Every attempt, retries included, spends one token from the shared
/// limiter before going to the network.
pub struct HttpCaptionFetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    format: PayloadFormat,
    attempt_timeout: Duration,
}

impl HttpCaptionFetcher {
    pub fn new(
        client: Client,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        format: PayloadFormat,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            client,
            limiter,
            retry,
            format,
            attempt_timeout,
        }
    }

    async fn attempt(
        client: Client,
        limiter: Arc<RateLimiter>,
        url: String,
        format: PayloadFormat,
        timeout: Duration,
    ) -> Result<RawCaptionPayload, FetchFailure> {
        limiter.acquire().await.map_err(FetchFailure::Fatal)?;

        let mut request = client.get(&url).timeout(timeout);
        if let Some(fmt) = format.query_value() {
            request = request.query(&[("fmt", fmt)]);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                return Err(FetchFailure::Transient(format!(
                    "caption request failed: {err}"
                )))
            }
        };

        match response.status() {
            status if status.is_success() => {
                let body = response.text().await.map_err(|err| {
                    FetchFailure::Transient(format!("caption response truncated: {err}"))
                })?;
                Ok(RawCaptionPayload { format, body })
            }
            StatusCode::TOO_MANY_REQUESTS => Err(FetchFailure::Fatal(
                TranscriptError::RateLimited("upstream throttled the caption fetch".to_string()),
            )),
            status if status.is_server_error() => Err(FetchFailure::Transient(format!(
                "caption endpoint returned HTTP {status}"
            ))),
            // 4xx means the payload is gone or was never there; retrying
            // cannot help.
            status => Err(FetchFailure::Fatal(TranscriptError::UpstreamUnavailable(
                format!("caption payload unavailable: HTTP {status}"),
            ))),
        }
    }
}

#[async_trait]
impl CaptionFetcher for HttpCaptionFetcher {
    async fn fetch(&self, track: &CaptionTrack) -> Result<RawCaptionPayload, TranscriptError> {
        tracing::debug!(
            language = %track.language,
            kind = track.kind.as_str(),
            "fetching caption payload"
        );

        let client = self.client.clone();
        let limiter = Arc::clone(&self.limiter);
        let url = track.base_url.clone();
        let format = self.format;
        let timeout = self.attempt_timeout;

        self.retry
            .run(move |_attempt| {
                Self::attempt(
                    client.clone(),
                    Arc::clone(&limiter),
                    url.clone(),
                    format,
                    timeout,
                )
            })
            .await
    }
}
