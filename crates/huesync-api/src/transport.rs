// Shared transport configuration for building reqwest::Client instances.

use std::time::Duration;

const USER_AGENT: &str = concat!("huesync/", env!("CARGO_PKG_VERSION"));

/// Transport settings for the hub HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request network timeout. There is no overall operation timeout.
    pub timeout: Duration,
    /// Accept self-signed certificates (hubs serve HTTPS with their own CA).
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            accept_invalid_certs: true,
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
