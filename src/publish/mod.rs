//! Publishing collected tools to a code-hosting platform.
//!
//! The pipeline only depends on the [`Publisher`] trait. [`GitHubClient`] is
//! the production implementation; every operation reports success or failure
//! and none is retried.

mod error;
mod github;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

pub use error::PublishError;
pub use github::{DEFAULT_API_URL, GitHubClient};

use crate::tool::CanonicalTool;

/// Labels applied to issues when the caller passes none.
pub const DEFAULT_ISSUE_LABELS: [&str; 3] = ["verification-tools", "beta", "automated"];

/// Tools per upload batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Branch used as pull-request base and default upload target.
pub const DEFAULT_BRANCH: &str = "main";

/// A repository identified as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoSlug {
    type Err = PublishError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || PublishError::InvalidRepository {
            value: value.to_string(),
        };
        let (owner, name) = value.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Core API quota as reported by the platform; all zeros when unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub remaining: u64,
    /// Unix time at which the quota resets.
    pub reset: u64,
    pub limit: u64,
}

/// A group of tools prepared for upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadBatch {
    /// 1-based.
    pub batch_number: usize,
    pub tools: Vec<CanonicalTool>,
    pub prepared_at: DateTime<Utc>,
}

/// Splits `tools` into consecutive batches of at most `group_size` tools.
#[must_use]
pub fn batch_into(tools: &[CanonicalTool], group_size: usize) -> Vec<UploadBatch> {
    let prepared_at = Utc::now();
    let batches: Vec<UploadBatch> = tools
        .chunks(group_size.max(1))
        .enumerate()
        .map(|(index, chunk)| UploadBatch {
            batch_number: index + 1,
            tools: chunk.to_vec(),
            prepared_at,
        })
        .collect();
    info!(batches = batches.len(), "upload batches prepared");
    batches
}

/// Capabilities the pipeline needs from a code-hosting platform.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Whether write operations can be attempted.
    fn has_token(&self) -> bool;

    /// Creates or replaces `path` on `branch` with `content`.
    async fn upload_file(&self, path: &str, content: &str, message: &str, branch: &str) -> bool;

    /// Opens an issue and returns its web URL. Empty `labels` means
    /// [`DEFAULT_ISSUE_LABELS`].
    async fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> Option<String>;

    /// Opens a pull request from `head` into [`DEFAULT_BRANCH`] and returns its web URL.
    async fn create_pull_request(&self, head: &str, title: &str, body: &str) -> Option<String>;

    async fn check_rate_limit(&self) -> RateLimitStatus;

    /// With a token, whether it may push; without one, whether the
    /// repository is readable.
    async fn check_repository_access(&self) -> bool;
}
