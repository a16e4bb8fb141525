//! Error types for the code-hosting integration.

use thiserror::Error;

/// Errors raised while publishing to the code-hosting platform.
#[derive(Debug, Clone, Error)]
pub enum PublishError {
    /// A write operation was attempted without a token.
    #[error("{operation} requires a GitHub token\n  Suggestion: Set GITHUB_TOKEN or add github_token to config.json")]
    MissingToken { operation: String },

    /// The repository slug is not `owner/name`.
    #[error("invalid repository '{value}'\n  Suggestion: Use the form owner/name, e.g. andreixdbolos/proiect-vf")]
    InvalidRepository { value: String },

    /// The HTTP client could not be built.
    #[error("failed to build GitHub client: {0}")]
    ClientBuild(String),

    /// The request never produced a response.
    #[error("{operation} failed: {reason}\n  Suggestion: Check your network connection")]
    Request { operation: String, reason: String },

    /// The API answered with a non-success status.
    #[error("{operation} returned HTTP {status}")]
    HttpStatus { operation: String, status: u16 },

    /// The API answered with an unexpected body.
    #[error("{operation} returned an unexpected response: {reason}")]
    InvalidResponse { operation: String, reason: String },
}

impl PublishError {
    #[must_use]
    pub fn missing_token(operation: &str) -> Self {
        Self::MissingToken {
            operation: operation.to_string(),
        }
    }

    #[must_use]
    pub fn request(operation: &str, reason: &str) -> Self {
        Self::Request {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn http_status(operation: &str, status: u16) -> Self {
        Self::HttpStatus {
            operation: operation.to_string(),
            status,
        }
    }

    #[must_use]
    pub fn invalid_response(operation: &str, reason: &str) -> Self {
        Self::InvalidResponse {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_message() {
        let msg = PublishError::missing_token("upload").to_string();
        assert!(msg.contains("upload requires a GitHub token"));
        assert!(msg.contains("GITHUB_TOKEN"));
    }

    #[test]
    fn test_invalid_repository_message() {
        let err = PublishError::InvalidRepository {
            value: "no-slash".to_string(),
        };
        assert!(err.to_string().contains("owner/name"));
    }

    #[test]
    fn test_http_status_message() {
        assert_eq!(
            PublishError::http_status("create issue", 422).to_string(),
            "create issue returned HTTP 422"
        );
    }
}
