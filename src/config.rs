//! Client configuration

use std::env;
use std::time::Duration;

use crate::store::DEFAULT_MAX_SEQUENCE;
use crate::types::{FetchError, Result};

/// How a recovery reply is matched to the resend that prompted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyCorrelation {
    /// The next reply belongs to the last request; it is stored at its own sequence.
    #[default]
    ArrivalOrder,
    /// A reply whose sequence differs from the requested one is discarded.
    EchoedSequence,
}

/// Configuration for a fetch
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Server address as `host:port`
    pub endpoint: String,
    /// Limit on establishing each connection
    pub connect_timeout: Option<Duration>,
    /// Limit on waiting for the next bytes from the server
    pub read_timeout: Option<Duration>,
    /// Recovery reply matching policy
    pub correlation: ReplyCorrelation,
    /// Highest sequence number the store will accept
    pub max_sequence: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:3000".to_string(),
            connect_timeout: Some(Duration::from_secs(5)),
            read_timeout: Some(Duration::from_secs(10)),
            correlation: ReplyCorrelation::default(),
            max_sequence: DEFAULT_MAX_SEQUENCE,
        }
    }
}

impl FetchConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_correlation(mut self, correlation: ReplyCorrelation) -> Self {
        self.correlation = correlation;
        self
    }

    pub fn with_max_sequence(mut self, max_sequence: u32) -> Self {
        self.max_sequence = max_sequence;
        self
    }

    /// Build a config from `CLIENT_PORT`, `CLIENT_HOST`, `CLIENT_CONNECT_TIMEOUT_MS`
    /// and `CLIENT_READ_TIMEOUT_MS`. A timeout of `0` disables it.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("CLIENT_PORT")
            .ok_or_else(|| FetchError::Config("CLIENT_PORT is not set".to_string()))?
            .trim()
            .parse()
            .map_err(|e| FetchError::Config(format!("CLIENT_PORT: {}", e)))?;
        let host = lookup("CLIENT_HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let mut config = Self::new(format!("{}:{}", host.trim(), port));
        if let Some(raw) = lookup("CLIENT_CONNECT_TIMEOUT_MS") {
            config.connect_timeout = parse_timeout("CLIENT_CONNECT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("CLIENT_READ_TIMEOUT_MS") {
            config.read_timeout = parse_timeout("CLIENT_READ_TIMEOUT_MS", &raw)?;
        }
        Ok(config)
    }
}

fn parse_timeout(key: &str, raw: &str) -> Result<Option<Duration>> {
    let millis: u64 = raw
        .trim()
        .parse()
        .map_err(|e| FetchError::Config(format!("{}: {}", key, e)))?;
    Ok((millis > 0).then(|| Duration::from_millis(millis)))
}
