use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::retry::RetryPolicy;
use crate::fetch::PayloadFormat;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Language preferences
    pub languages: LanguageConfig,

    /// Transcript cache settings
    pub cache: CacheConfig,

    /// Outbound rate limiting
    pub rate_limit: RateLimitConfig,

    /// Retry behavior for transient upstream failures
    pub retry: RetryConfig,

    /// Request timeouts
    pub timeouts: TimeoutConfig,

    /// Upstream endpoint settings
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Default preferred languages, walked in order when a request has none
    pub preferred: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a cached transcript stays fresh, in seconds
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Token refill rate, requests per second
    pub per_second: f64,

    /// Bucket capacity for short bursts
    pub burst: u32,

    /// Longest a fetch waits for a token before failing, in milliseconds
    pub max_wait_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempt ceiling, first try included
    pub max_attempts: u32,

    /// Backoff base delay in milliseconds, doubled per attempt
    pub base_delay_ms: u64,

    /// Backoff cap in milliseconds
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Per-attempt HTTP timeout, in seconds
    pub attempt_secs: u64,

    /// Overall deadline for one transcript retrieval, in seconds
    pub overall_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Player metadata endpoint the resolver queries
    pub player_url: String,

    /// Client identity reported to the player endpoint
    pub client_name: String,
    pub client_version: String,

    /// User agent for all outbound requests
    pub user_agent: String,

    /// Caption encoding to request: "xml" or "json3"
    pub caption_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languages: LanguageConfig {
                preferred: vec!["en".to_string()],
            },
            cache: CacheConfig { ttl_secs: 300 },
            rate_limit: RateLimitConfig {
                per_second: 4.0,
                burst: 8,
                max_wait_ms: 5_000,
            },
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 500,
                max_delay_ms: 10_000,
            },
            timeouts: TimeoutConfig {
                attempt_secs: 10,
                overall_secs: 30,
            },
            upstream: UpstreamConfig {
                player_url: "https://www.youtube.com/youtubei/v1/player".to_string(),
                client_name: "WEB".to_string(),
                client_version: "2.20240101.00.00".to_string(),
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ytt/0.1".to_string(),
                caption_format: "json3".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content =
                fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            let config: Config =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Where the active configuration file lives
    pub fn path() -> Result<PathBuf> {
        Self::config_path()
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("ytt").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.languages.preferred.is_empty() {
            anyhow::bail!("At least one preferred language must be configured");
        }

        if self.rate_limit.per_second <= 0.0 {
            anyhow::bail!("Rate limit must be positive");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("Retry attempt ceiling must be at least 1");
        }

        if !self.upstream.player_url.starts_with("http") {
            anyhow::bail!("Player URL must be an HTTP(S) endpoint");
        }

        self.caption_format()?;

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Preferred Languages: {}", self.languages.preferred.join(", "));
        println!("  Cache TTL: {}s", self.cache.ttl_secs);
        println!(
            "  Rate Limit: {}/s (burst {})",
            self.rate_limit.per_second, self.rate_limit.burst
        );
        println!(
            "  Retries: {} attempts, {}ms base backoff",
            self.retry.max_attempts, self.retry.base_delay_ms
        );
        println!(
            "  Timeouts: {}s per attempt, {}s overall",
            self.timeouts.attempt_secs, self.timeouts.overall_secs
        );
        println!("  Caption Format: {}", self.upstream.caption_format);
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn rate_limit_max_wait(&self) -> Duration {
        Duration::from_millis(self.rate_limit.max_wait_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.attempt_secs)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.overall_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
    }

    /// The caption encoding requested from upstream
    pub fn caption_format(&self) -> Result<PayloadFormat> {
        self.upstream.caption_format.parse()
    }
}
