//! Network reachability check run before any network-bound work.
//!
//! When the check itself is inconclusive (it timed out, or failed for a
//! reason other than being unable to connect) the probe reports connected.
//! An upload on a flaky link may then fail later at the transport layer
//! instead of up front.

use async_trait::async_trait;
use notehub_core::{Config, NoteError, NoteResult};
use reqwest::Client;
use std::time::Duration;

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Whether the backend looks reachable. Returns within a short bound.
    async fn is_connected(&self) -> bool;
}

/// Probe that answers with a fixed value
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub bool);

#[async_trait]
impl ConnectivityProbe for StaticConnectivity {
    async fn is_connected(&self) -> bool {
        self.0
    }
}

/// Probe that sends a lightweight request to the backend's health endpoint.
///
/// Any HTTP answer, whatever its status, means the network path works.
#[derive(Clone)]
pub struct HttpConnectivityProbe {
    client: Client,
    health_url: String,
    timeout: Duration,
}

impl HttpConnectivityProbe {
    pub fn new(health_url: impl Into<String>, timeout: Duration) -> NoteResult<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| NoteError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            health_url: health_url.into(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> NoteResult<Self> {
        Self::new(
            format!("{}/health", config.auth_api_url()),
            config.connectivity_probe_timeout(),
        )
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn is_connected(&self) -> bool {
        let start = std::time::Instant::now();
        let request = self.client.get(&self.health_url).send();

        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => {
                tracing::debug!(
                    status = response.status().as_u16(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Connectivity probe answered"
                );
                true
            }
            Ok(Err(e)) if e.is_connect() => {
                tracing::warn!(error = %e, url = %self.health_url, "Connectivity probe could not connect");
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Connectivity probe failed, assuming connected");
                true
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Connectivity probe timed out, assuming connected"
                );
                true
            }
        }
    }
}
