//! Shared HTTP client construction policy.
//!
//! The search client and the publishing client both go through
//! [`build_http_client`] so they agree on timeouts, compression and User-Agent.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::CrawlError;

/// Default connect timeout in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default read timeout in seconds.
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Timeouts applied to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// Builds an HTTP client with the project User-Agent and the given timeouts.
///
/// `client_name` only appears in logs and error messages.
///
/// # Errors
///
/// Returns [`CrawlError::ClientBuild`] when reqwest rejects the configuration.
pub fn build_http_client(
    client_name: &str,
    user_agent: &str,
    timeouts: HttpTimeouts,
) -> Result<Client, CrawlError> {
    debug!(
        client = client_name,
        connect_timeout_secs = timeouts.connect_timeout_secs,
        read_timeout_secs = timeouts.read_timeout_secs,
        "building HTTP client"
    );

    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_timeout_secs))
        .timeout(Duration::from_secs(timeouts.read_timeout_secs))
        .user_agent(user_agent)
        .gzip(true)
        .build()
        .map_err(|error| CrawlError::client_build(client_name, &error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = HttpTimeouts::default();
        assert_eq!(timeouts.connect_timeout_secs, 10);
        assert_eq!(timeouts.read_timeout_secs, 30);
    }

    #[test]
    fn test_build_http_client_succeeds_with_defaults() {
        let client = build_http_client("test", "vtools-test/0.0", HttpTimeouts::default());
        assert!(client.is_ok());
    }
}
