//! Error types for crawl operations.
//!
//! Search failures are converted to empty results at the [`super::SearchApi`]
//! boundary; these errors exist so the failure reason can be logged and tested.

use thiserror::Error;

/// Errors that can occur while talking to the search API.
#[derive(Debug, Clone, Error)]
pub enum CrawlError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client for {client}: {reason}\n  Suggestion: Check proxy and TLS settings")]
    ClientBuild {
        /// Which client failed to build
        client: String,
        /// Why construction failed
        reason: String,
    },

    /// The request never produced a response.
    #[error("request for '{target}' failed: {reason}\n  Suggestion: Check your network connection")]
    Request {
        /// Query or record id being requested
        target: String,
        /// Transport-level failure text
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("request for '{target}' returned HTTP {status}: {reason}")]
    HttpStatus {
        /// Query or record id being requested
        target: String,
        /// HTTP status code
        status: u16,
        /// Human-readable explanation of the status
        reason: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response for '{target}': {reason}")]
    InvalidResponse {
        /// Query or record id being requested
        target: String,
        /// Decoding failure text
        reason: String,
    },
}

impl CrawlError {
    /// Creates a `ClientBuild` error.
    #[must_use]
    pub fn client_build(client: &str, reason: &str) -> Self {
        Self::ClientBuild {
            client: client.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Request` error.
    #[must_use]
    pub fn request(target: &str, reason: &str) -> Self {
        Self::Request {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates an `HttpStatus` error with a reason derived from the status code.
    #[must_use]
    pub fn http_status(target: &str, status: u16) -> Self {
        let reason = match status {
            404 => "record not found".to_string(),
            429 => "rate limit exceeded, try again later".to_string(),
            s if s >= 500 => "search API unavailable, try again later".to_string(),
            s => format!("unexpected HTTP status {s}"),
        };
        Self::HttpStatus {
            target: target.to_string(),
            status,
            reason,
        }
    }

    /// Creates an `InvalidResponse` error.
    #[must_use]
    pub fn invalid_response(target: &str, reason: &str) -> Self {
        Self::InvalidResponse {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns the HTTP status code, when this is a status error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
