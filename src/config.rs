use crate::error::Error;
use std::time::Duration;
use url::Url;

/// Configuration for a channel manager
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// HTTP(S) base address of the dashboard server. The scheme is rewritten
    /// to ws(s) when opening the event stream.
    pub base_url: Url,
    /// Backoff settings for reconnection
    pub backoff: BackoffConfig,
}

impl ChannelConfig {
    /// Create a new builder for configuration
    pub fn builder() -> ChannelConfigBuilder {
        ChannelConfigBuilder::default()
    }
}

/// Builder for ChannelConfig
#[derive(Debug, Clone, Default)]
pub struct ChannelConfigBuilder {
    base_url: Option<String>,
    backoff: BackoffConfig,
}

impl ChannelConfigBuilder {
    /// Set the HTTP(S) base address of the server
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = config;
        self
    }

    /// Build the configuration with validation.
    ///
    /// Returns an error for invalid configurations (e.g., a base URL without
    /// a host, or a zero backoff floor).
    pub fn build(self) -> Result<ChannelConfig, ConfigError> {
        let raw = self
            .base_url
            .ok_or_else(|| ConfigError::InvalidBaseUrl("base_url is required".to_string()))?;

        let base_url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidBaseUrl(format!("{}: {}", raw, e)))?;

        if !matches!(base_url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(ConfigError::InvalidBaseUrl(format!(
                "unsupported scheme '{}'",
                base_url.scheme()
            )));
        }

        if base_url.host_str().is_none() {
            return Err(ConfigError::InvalidBaseUrl(format!("no host in '{}'", raw)));
        }

        if self.backoff.initial_delay.is_zero() {
            return Err(ConfigError::InvalidBackoff(
                "initial_delay must be > 0".to_string(),
            ));
        }

        if self.backoff.multiplier <= 0.0 {
            return Err(ConfigError::InvalidBackoff(
                "multiplier must be > 0".to_string(),
            ));
        }

        if self.backoff.max_attempts == 0 {
            return Err(ConfigError::InvalidBackoff(
                "max_attempts must be >= 1".to_string(),
            ));
        }

        Ok(ChannelConfig {
            base_url,
            backoff: self.backoff,
        })
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid base URL
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    /// Invalid backoff configuration
    #[error("Invalid backoff configuration: {0}")]
    InvalidBackoff(String),
}

/// Backoff configuration for reconnection
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first reconnection attempt
    pub initial_delay: Duration,
    /// Multiplier applied after each attempt (typically 2.0)
    pub multiplier: f64,
    /// Maximum number of reconnection attempts before giving up.
    /// Once exceeded, the channel stays disconnected until a fresh
    /// `connect` call.
    pub max_attempts: u32,
    /// Whether to add random jitter to delays
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_attempts: 5,
            jitter: false,
        }
    }
}

impl BackoffConfig {
    /// Calculate the delay for a given attempt number (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);

        if self.jitter {
            // Full jitter: random value between 0 and the computed delay
            let jittered = rand::random::<f64>() * delay;
            Duration::from_millis(jittered as u64)
        } else {
            Duration::from_millis(delay as u64)
        }
    }
}

/// Build the event stream address for a subscription key: the base address
/// with its scheme rewritten to ws(s) and path `/ws/project/{key}`.
pub(crate) fn endpoint_url(base: &Url, key: &str) -> Result<Url, Error> {
    let mut url = base.clone();

    let scheme = match base.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => base.scheme(),
        other => {
            return Err(Error::InvalidEndpoint(format!(
                "unsupported scheme '{}'",
                other
            )))
        }
    };

    url.set_scheme(scheme)
        .map_err(|_| Error::InvalidEndpoint(format!("cannot use scheme '{}' on {}", scheme, base)))?;
    url.set_path(&format!("/ws/project/{}", key));
    url.set_query(None);

    Ok(url)
}
