//! Fixed pacing delays between consecutive search requests.
//!
//! Pacing is not adaptive: it never reads rate-limit headers and only lowers
//! the chance of exceeding the anonymous request quota.

use std::time::Duration;

use tracing::trace;

/// Default pause between pages of one query (milliseconds).
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;

/// Default pause between two catalog queries (milliseconds).
pub const DEFAULT_QUERY_DELAY_MS: u64 = 1000;

/// Fixed delays applied by the crawler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    request_delay: Duration,
    query_delay: Duration,
}

impl Pacer {
    #[must_use]
    pub fn new(request_delay: Duration, query_delay: Duration) -> Self {
        Self {
            request_delay,
            query_delay,
        }
    }

    /// A pacer that never sleeps.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    #[must_use]
    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    #[must_use]
    pub fn query_delay(&self) -> Duration {
        self.query_delay
    }

    /// Waits before requesting the next page of the same query.
    pub async fn before_next_page(&self) {
        pause(self.request_delay).await;
    }

    /// Waits before issuing the next catalog query.
    pub async fn before_next_query(&self) {
        pause(self.query_delay).await;
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            Duration::from_millis(DEFAULT_QUERY_DELAY_MS),
        )
    }
}

async fn pause(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    trace!(delay_ms = delay.as_millis(), "pacing");
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delays() {
        let pacer = Pacer::default();
        assert_eq!(pacer.request_delay(), Duration::from_millis(500));
        assert_eq!(pacer.query_delay(), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_disabled_pacer_returns_immediately() {
        let pacer = Pacer::disabled();
        let start = tokio::time::Instant::now();
        pacer.before_next_page().await;
        pacer.before_next_query().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_sleeps_for_configured_delay() {
        let pacer = Pacer::new(Duration::from_millis(200), Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        pacer.before_next_page().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
        pacer.before_next_query().await;
        assert!(start.elapsed() >= Duration::from_millis(2200));
    }
}
