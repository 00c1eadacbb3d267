use std::time::Duration;
use url::Url;

/// Configuration for a [`Client`](crate::Client)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint URL (`ws://` or `wss://`)
    pub url: String,
    /// Interval between liveness probes while connected.
    /// `Duration::ZERO` disables the heartbeat entirely.
    pub heartbeat_interval: Duration,
    /// Backoff settings for reconnection
    pub backoff: BackoffConfig,
    /// Timeout for establishing a connection
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a new builder for configuration
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    url: Option<String>,
    heartbeat_interval: Duration,
    backoff: BackoffConfig,
    connect_timeout: Duration,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            url: None,
            heartbeat_interval: Duration::from_millis(15_000),
            backoff: BackoffConfig::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfigBuilder {
    /// Set the endpoint URL (required)
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the heartbeat interval. `Duration::ZERO` disables heartbeats.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the initial reconnect delay
    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.backoff.initial_delay = delay;
        self
    }

    /// Set the maximum reconnect delay
    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.backoff.max_delay = delay;
        self
    }

    /// Set the connection establishment timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build the configuration with validation.
    ///
    /// Returns an error if the URL is missing or not a WebSocket URL,
    /// or if the backoff bounds are inverted.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let url = self.url.ok_or(ConfigError::MissingUrl)?;

        let parsed = Url::parse(&url).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
        match parsed.scheme() {
            "ws" | "wss" => {}
            scheme => {
                return Err(ConfigError::InvalidUrl(format!(
                    "unsupported scheme '{}', expected ws or wss",
                    scheme
                )))
            }
        }

        if self.backoff.max_delay < self.backoff.initial_delay {
            return Err(ConfigError::InvalidBackoff(
                "max_delay must be >= initial_delay".to_string(),
            ));
        }

        Ok(ClientConfig {
            url,
            heartbeat_interval: self.heartbeat_interval,
            backoff: self.backoff,
            connect_timeout: self.connect_timeout,
        })
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// No endpoint URL was supplied
    #[error("missing endpoint URL")]
    MissingUrl,
    /// The endpoint URL could not be parsed or is not ws/wss
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
    /// Invalid backoff configuration
    #[error("invalid backoff configuration: {0}")]
    InvalidBackoff(String),
}

/// Backoff configuration for reconnection.
///
/// The delay doubles on every failed attempt and is clamped to `max_delay`.
/// The attempt counter resets the moment a connection opens successfully.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first reconnection attempt
    pub initial_delay: Duration,
    /// Maximum delay between reconnection attempts
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(5_000),
        }
    }
}

impl BackoffConfig {
    /// Calculate the delay for a given attempt number (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_doubles_and_clamps() {
        let config = BackoffConfig {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(5_000),
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1_000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2_000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(4_000));

        // Fifth and later attempts clamp to max_delay
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(5_000));
        assert_eq!(config.delay_for_attempt(20), Duration::from_millis(5_000));
    }

    #[test]
    fn test_backoff_delay_is_monotonic() {
        let config = BackoffConfig::default();
        let mut previous = Duration::ZERO;
        for attempt in 0..16 {
            let delay = config.delay_for_attempt(attempt);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn test_backoff_survives_huge_attempt_numbers() {
        let config = BackoffConfig::default();
        assert_eq!(config.delay_for_attempt(u32::MAX), config.max_delay);
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = ClientConfig::builder()
            .url("wss://example.com/feed")
            .build()
            .expect("valid config");

        assert_eq!(config.heartbeat_interval, Duration::from_millis(15_000));
        assert_eq!(config.backoff.initial_delay, Duration::from_millis(500));
        assert_eq!(config.backoff.max_delay, Duration::from_millis(5_000));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_builder_requires_url() {
        assert!(matches!(
            ClientConfig::builder().build(),
            Err(ConfigError::MissingUrl)
        ));
    }

    #[test]
    fn test_config_builder_rejects_non_ws_url() {
        let result = ClientConfig::builder().url("https://example.com").build();
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));

        let result = ClientConfig::builder().url("not a url").build();
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_config_builder_rejects_inverted_backoff() {
        let result = ClientConfig::builder()
            .url("ws://example.com")
            .initial_backoff(Duration::from_secs(10))
            .max_backoff(Duration::from_secs(1))
            .build();

        assert!(matches!(result, Err(ConfigError::InvalidBackoff(_))));
    }
}
