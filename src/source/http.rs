//! HTTP snapshot source.
//!
//! Issues one GET to a fixed upstream resource and decodes its JSON body.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::source::{Snapshot, SnapshotSource, SourceError};

/// Default upstream resource: the ISS on wheretheiss.at.
pub const DEFAULT_SOURCE_URL: &str = "https://api.wheretheiss.at/v1/satellites/25544";

/// Default request timeout (10 seconds).
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

fn default_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_SOURCE_TIMEOUT
}

/// Configuration for the HTTP source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    /// Upstream URL returning a JSON snapshot.
    #[serde(default = "default_url")]
    pub url: String,
    /// Request timeout (default: 10s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }
}

impl HttpSourceConfig {
    /// Create a configuration for `url` with the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Snapshot source backed by an HTTP JSON endpoint.
pub struct HttpSource {
    config: HttpSourceConfig,
    client: Client,
}

impl HttpSource {
    /// Create a new HTTP source.
    ///
    /// # Errors
    /// Returns `SourceError::Unavailable` if the HTTP client cannot be built.
    pub fn new(config: HttpSourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Get the source configuration.
    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    async fn request(&self) -> Result<Snapshot, SourceError> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "upstream returned status {status}"
            )));
        }

        response
            .json::<Snapshot>()
            .await
            .map_err(|e| SourceError::Unavailable(format!("malformed payload: {e}")))
    }
}

impl std::fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl SnapshotSource for HttpSource {
    fn name(&self) -> &str {
        &self.config.url
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, SourceError> {
        let start = Instant::now();
        let result = timeout(self.config.timeout, self.request()).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(Ok(snapshot)) => {
                tracing::debug!(
                    url = %self.config.url,
                    latency_ms,
                    latitude = snapshot.latitude,
                    longitude = snapshot.longitude,
                    "Snapshot fetched"
                );
                Ok(snapshot)
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %self.config.url, error = %e, "Snapshot fetch failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    url = %self.config.url,
                    timeout_ms = self.config.timeout.as_millis(),
                    "Snapshot fetch timed out"
                );
                Err(SourceError::Unavailable("request timed out".to_string()))
            }
        }
    }
}
