//! Client configuration
//!
//! This module contains all configuration options for the conversion client.
//! The backend base URL is always injected through [`ClientConfig`]; nothing
//! else in the crate knows a concrete host.

use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Environment variable overriding the backend base URL
pub const ENV_BASE_URL: &str = "CONVERTIFILE_BASE_URL";
/// Environment variable selecting a deployment preset
pub const ENV_DEPLOYMENT: &str = "CONVERTIFILE_DEPLOYMENT";
/// Environment variable overriding the poll interval (milliseconds)
pub const ENV_POLL_INTERVAL_MS: &str = "CONVERTIFILE_POLL_INTERVAL_MS";
/// Environment variable overriding the poll retry ceiling
pub const ENV_MAX_RETRIES: &str = "CONVERTIFILE_MAX_RETRIES";

/// Known backend deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    /// Local backend started next to the front end
    Development,
    /// Hosted utility backend
    Production,
}

impl Deployment {
    pub fn base_url(self) -> &'static str {
        match self {
            Deployment::Development => "http://localhost:8000/convertifileapp",
            Deployment::Production => "https://utility.toridoesthings.xyz/convertifile",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Some(Deployment::Development),
            "production" | "prod" => Some(Deployment::Production),
            _ => None,
        }
    }
}

/// Main configuration for the conversion client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `http://localhost:8000/convertifileapp`
    pub base_url: String,

    /// Delay between two jobs of a batch, in milliseconds
    pub inter_job_delay_ms: u64,

    /// Interval of the server health check, in seconds
    pub health_interval_secs: u64,

    /// Directory converted files are saved to
    pub download_dir: PathBuf,

    /// Polling behaviour
    pub poll: PollPolicy,

    /// HTTP configuration
    pub http: HttpConfig,
}

/// Status polling policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Fast polling interval in milliseconds
    pub interval_ms: u64,

    /// Number of polls before the job is declared timed out
    pub max_retries: u32,

    /// Consecutive transient errors tolerated before switching to the slow interval
    pub error_backoff_threshold: u32,

    /// Attempts without a `status` field before probing the result endpoint
    pub probe_after: u32,
}

/// HTTP-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Connection timeout in seconds
    pub connect_timeout: u64,

    /// Longest pause between two reads of a response, in seconds
    pub read_timeout: u64,

    /// Maximum redirects to follow
    pub max_redirects: usize,

    /// User agent sent with every request
    pub user_agent: String,

    /// Whether to accept invalid TLS certificates (dangerous!)
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_deployment(Deployment::Development)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            max_retries: 20,
            error_backoff_threshold: 5,
            probe_after: 6,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 30,
            read_timeout: 300,
            max_redirects: 10,
            user_agent: format!("convertifile/{}", env!("CARGO_PKG_VERSION")),
            accept_invalid_certs: false,
        }
    }
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Interval used once transient errors pile up
    pub fn backoff_interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.saturating_mul(2))
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(ConvertError::invalid_input(
                "poll.interval_ms",
                "Must be at least 1",
            ));
        }

        if self.max_retries == 0 {
            return Err(ConvertError::invalid_input(
                "poll.max_retries",
                "Must be at least 1",
            ));
        }

        Ok(())
    }
}

impl ClientConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Config preset for a known deployment
    pub fn for_deployment(deployment: Deployment) -> Self {
        Self {
            base_url: deployment.base_url().to_string(),
            inter_job_delay_ms: 300,
            health_interval_secs: 30,
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            poll: PollPolicy::default(),
            http: HttpConfig::default(),
        }
    }

    /// Build a config from the environment, starting from the selected
    /// deployment preset (development when unset).
    pub fn from_env() -> Result<Self> {
        let deployment = match std::env::var(ENV_DEPLOYMENT) {
            Ok(value) => Deployment::parse(&value).ok_or_else(|| {
                ConvertError::invalid_input("deployment", format!("Unknown deployment: {}", value))
            })?,
            Err(_) => Deployment::Development,
        };

        let mut config = Self::for_deployment(deployment);

        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Ok(ms) = std::env::var(ENV_POLL_INTERVAL_MS) {
            config.poll.interval_ms = ms.parse().map_err(|_| {
                ConvertError::invalid_input("poll.interval_ms", format!("Not a number: {}", ms))
            })?;
        }
        if let Ok(n) = std::env::var(ENV_MAX_RETRIES) {
            config.poll.max_retries = n.parse().map_err(|_| {
                ConvertError::invalid_input("poll.max_retries", format!("Not a number: {}", n))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the backend base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the maximum number of status polls
    pub fn max_retries(mut self, max: u32) -> Self {
        self.poll.max_retries = max;
        self
    }

    /// Set the delay between jobs of a batch
    pub fn inter_job_delay(mut self, delay: Duration) -> Self {
        self.inter_job_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the directory results are downloaded to
    pub fn download_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.download_dir = path.into();
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.http.user_agent = ua.into();
        self
    }

    pub fn inter_job_delay_duration(&self) -> Duration {
        Duration::from_millis(self.inter_job_delay_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }

    /// Base URL without a trailing slash
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let parsed = Url::parse(&self.base_url).map_err(|e| {
            ConvertError::invalid_input("base_url", format!("Invalid URL: {}", e))
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ConvertError::invalid_input(
                    "base_url",
                    format!("Unsupported scheme: {}", scheme),
                ));
            }
        }

        self.poll.validate()?;

        if self.health_interval_secs == 0 {
            return Err(ConvertError::invalid_input(
                "health_interval_secs",
                "Must be at least 1",
            ));
        }

        Ok(())
    }
}
