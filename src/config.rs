//! Configuration for the transport and RPC clients

use std::time::Duration;

use crate::error::Result;
use crate::transport::endpoint_from_origin;

/// Configuration for connecting to a visualization server
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Duplex endpoint (e.g., "ws://localhost:8765/ws")
    pub url: String,

    /// Bearer token sent during the channel handshake
    pub token: Option<String>,

    /// Base delay before the first reconnection attempt
    pub reconnect_delay: Duration,

    /// Maximum delay between reconnection attempts
    pub max_reconnect_delay: Duration,

    /// Reconnection attempts before giving up
    pub max_reconnect_attempts: u32,

    /// Interval between keepalive pings in duplex mode
    pub heartbeat_interval: Duration,

    /// How long a detection-phase open may take before it counts as failed
    pub detection_timeout: Duration,

    /// Delay between detection-phase attempts
    pub detection_retry_delay: Duration,

    /// Failed detection attempts before falling back to request/response mode
    pub max_detection_attempts: u32,

    /// Frames that may be queued for the writer before `send` reports failure
    pub outbound_buffer: usize,

    /// Request/response endpoint used once the duplex channel is ruled out
    pub fallback_url: Option<String>,
}

impl TransportConfig {
    /// Create a new configuration for the given duplex endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            max_reconnect_attempts: 10,
            heartbeat_interval: Duration::from_secs(30),
            detection_timeout: Duration::from_secs(3),
            detection_retry_delay: Duration::from_millis(500),
            max_detection_attempts: 3,
            outbound_buffer: 256,
            fallback_url: None,
        }
    }

    /// Derive the duplex endpoint from a page origin (`http://host` becomes `ws://host/ws`)
    pub fn from_origin(origin: &str) -> Result<Self> {
        let url = endpoint_from_origin(origin)?;
        Ok(Self::new(url.to_string()))
    }

    /// Build a configuration from `VIZLINK_*` environment variables.
    ///
    /// `VIZLINK_URL` wins over `VIZLINK_ORIGIN`; with neither set the local
    /// reference server address is used.
    pub fn from_env() -> Result<Self> {
        let mut config = match (
            std::env::var("VIZLINK_URL").ok(),
            std::env::var("VIZLINK_ORIGIN").ok(),
        ) {
            (Some(url), _) => Self::new(url),
            (None, Some(origin)) => Self::from_origin(&origin)?,
            (None, None) => Self::new("ws://localhost:8765/ws"),
        };

        if let Ok(token) = std::env::var("VIZLINK_TOKEN") {
            config.token = Some(token);
        }
        if let Ok(fallback) = std::env::var("VIZLINK_FALLBACK_URL") {
            config.fallback_url = Some(fallback);
        }

        Ok(config)
    }

    /// Set the handshake token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the reconnection delay range
    pub fn reconnect_delay(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_delay = initial;
        self.max_reconnect_delay = max;
        self
    }

    /// Set the number of reconnection attempts before giving up
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set the heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Tune the detection phase
    pub fn detection(mut self, timeout: Duration, retry_delay: Duration, attempts: u32) -> Self {
        self.detection_timeout = timeout;
        self.detection_retry_delay = retry_delay;
        self.max_detection_attempts = attempts;
        self
    }

    /// Set the request/response fallback endpoint
    pub fn fallback_url(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = Some(url.into());
        self
    }
}

/// Configuration for the RPC correlation layer
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Deadline applied to calls that don't specify one
    pub default_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
        }
    }
}

impl RpcConfig {
    /// Set the default call timeout
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_defaults() {
        let config = TransportConfig::new("ws://localhost:8765/ws");

        assert_eq!(config.url, "ws://localhost:8765/ws");
        assert!(config.token.is_none());
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(30));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.detection_timeout, Duration::from_secs(3));
        assert_eq!(config.detection_retry_delay, Duration::from_millis(500));
        assert_eq!(config.max_detection_attempts, 3);
        assert!(config.fallback_url.is_none());
    }

    #[test]
    fn test_config_from_origin_upcasts_scheme() {
        let config = TransportConfig::from_origin("https://viewer.example.com").unwrap();
        assert_eq!(config.url, "wss://viewer.example.com/ws");

        let config = TransportConfig::from_origin("http://localhost:3000").unwrap();
        assert_eq!(config.url, "ws://localhost:3000/ws");
    }

    #[test]
    fn test_config_from_origin_rejects_garbage() {
        assert!(TransportConfig::from_origin("not a url").is_err());
    }

    #[test]
    fn test_config_builder_chain() {
        let config = TransportConfig::new("ws://example.com/ws")
            .token("secret")
            .reconnect_delay(Duration::from_millis(100), Duration::from_secs(5))
            .max_reconnect_attempts(3)
            .heartbeat_interval(Duration::from_secs(10))
            .detection(Duration::from_secs(1), Duration::from_millis(50), 2)
            .fallback_url("http://example.com/rpc");

        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.reconnect_delay, Duration::from_millis(100));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.detection_timeout, Duration::from_secs(1));
        assert_eq!(config.detection_retry_delay, Duration::from_millis(50));
        assert_eq!(config.max_detection_attempts, 2);
        assert_eq!(config.fallback_url.as_deref(), Some("http://example.com/rpc"));
    }

    #[test]
    fn test_rpc_config_default() {
        let config = RpcConfig::default();
        assert_eq!(config.default_timeout, Duration::from_secs(30));

        let config = config.default_timeout(Duration::from_millis(250));
        assert_eq!(config.default_timeout, Duration::from_millis(250));
    }
}
