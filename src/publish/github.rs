//! GitHub REST API client.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{DEFAULT_BRANCH, DEFAULT_ISSUE_LABELS, PublishError, Publisher, RateLimitStatus, RepoSlug};
use crate::crawler::{HttpTimeouts, build_http_client};
use crate::user_agent::default_user_agent;

/// Default REST API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ACCEPT_V3: &str = "application/vnd.github.v3+json";

const fn default_rate_limit() -> u64 {
    60
}

#[derive(Debug, Deserialize)]
struct ContentInfo {
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HtmlUrl {
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    #[serde(default)]
    rate: RateBlock,
}

#[derive(Debug, Deserialize)]
struct RateBlock {
    #[serde(default)]
    remaining: u64,
    #[serde(default)]
    reset: u64,
    #[serde(default = "default_rate_limit")]
    limit: u64,
}

impl Default for RateBlock {
    fn default() -> Self {
        Self {
            remaining: 0,
            reset: 0,
            limit: default_rate_limit(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    full_name: Option<String>,
    #[serde(default)]
    permissions: Permissions,
}

#[derive(Debug, Default, Deserialize)]
struct Permissions {
    #[serde(default)]
    push: bool,
}

/// Client for one GitHub repository.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    repo: RepoSlug,
}

impl GitHubClient {
    /// Creates a client for `repo` against the public GitHub API.
    ///
    /// A missing or blank token leaves the client read-only.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::ClientBuild`] if HTTP client construction fails.
    pub fn new(token: Option<String>, repo: RepoSlug) -> Result<Self, PublishError> {
        Self::with_settings(DEFAULT_API_URL, token, repo, HttpTimeouts::default())
    }

    /// Creates a client against a custom API root (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::ClientBuild`] if HTTP client construction fails.
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: Option<String>,
        repo: RepoSlug,
    ) -> Result<Self, PublishError> {
        Self::with_settings(base_url, token, repo, HttpTimeouts::default())
    }

    /// Creates a client with an explicit API root and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::ClientBuild`] if HTTP client construction fails.
    pub fn with_settings(
        base_url: impl Into<String>,
        token: Option<String>,
        repo: RepoSlug,
        timeouts: HttpTimeouts,
    ) -> Result<Self, PublishError> {
        let client = build_http_client("github", &default_user_agent(), timeouts)
            .map_err(|e| PublishError::ClientBuild(e.to_string()))?;
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if token.is_none() {
            warn!("no GitHub token configured, write operations are disabled");
        }
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            repo,
        })
    }

    #[must_use]
    pub fn repo(&self) -> &RepoSlug {
        &self.repo
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.base_url,
            urlencoding::encode(&self.repo.owner),
            urlencoding::encode(&self.repo.name)
        )
    }

    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .trim_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/contents/{}", self.repo_url(), encoded.join("/"))
    }

    fn request(&self, method: Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
        let builder = self.client.request(method, url).header(ACCEPT, ACCEPT_V3);
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("token {token}")),
            None => builder,
        }
    }

    fn require_token(&self, operation: &str) -> Result<(), PublishError> {
        if self.token.is_some() {
            Ok(())
        } else {
            Err(PublishError::missing_token(operation))
        }
    }

    async fn send(operation: &str, request: RequestBuilder) -> Result<reqwest::Response, PublishError> {
        let response = request
            .send()
            .await
            .map_err(|e| PublishError::request(operation, &e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(PublishError::http_status(operation, status.as_u16()))
        }
    }

    /// Looks up the blob SHA of `path` on `branch`; `None` when the file does
    /// not exist or the lookup fails for any reason.
    pub async fn file_sha(&self, path: &str, branch: &str) -> Option<String> {
        let url = Url::parse_with_params(&self.contents_url(path), &[("ref", branch)]).ok()?;
        let response = self.request(Method::GET, url).send().await.ok()?;
        if response.status() != StatusCode::OK {
            return None;
        }
        response.json::<ContentInfo>().await.ok()?.sha
    }

    /// Uploads `content` to `path` on `branch`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] without a token, or when the PUT fails.
    pub async fn try_upload_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> Result<(), PublishError> {
        const OP: &str = "upload";
        self.require_token(OP)?;

        let sha = self.file_sha(path, branch).await;
        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": branch,
        });
        if let Some(sha) = &sha {
            body["sha"] = json!(sha);
            debug!(path, "updating existing file");
        } else {
            debug!(path, "creating new file");
        }

        Self::send(OP, self.request(Method::PUT, self.contents_url(path)).json(&body)).await?;
        Ok(())
    }

    /// Opens an issue and returns its web URL.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] without a token, or when the request fails.
    pub async fn try_create_issue(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<String, PublishError> {
        const OP: &str = "create issue";
        self.require_token(OP)?;

        let labels: Vec<String> = if labels.is_empty() {
            DEFAULT_ISSUE_LABELS.iter().map(|l| (*l).to_string()).collect()
        } else {
            labels.to_vec()
        };
        let payload = json!({ "title": title, "body": body, "labels": labels });

        let response = Self::send(
            OP,
            self.request(Method::POST, format!("{}/issues", self.repo_url()))
                .json(&payload),
        )
        .await?;
        Self::html_url(OP, response).await
    }

    /// Opens a pull request from `head` into the default branch.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] without a token, or when the request fails.
    pub async fn try_create_pull_request(
        &self,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<String, PublishError> {
        const OP: &str = "create pull request";
        self.require_token(OP)?;

        let payload = json!({ "title": title, "body": body, "head": head, "base": DEFAULT_BRANCH });
        let response = Self::send(
            OP,
            self.request(Method::POST, format!("{}/pulls", self.repo_url()))
                .json(&payload),
        )
        .await?;
        Self::html_url(OP, response).await
    }

    async fn html_url(operation: &str, response: reqwest::Response) -> Result<String, PublishError> {
        response
            .json::<HtmlUrl>()
            .await
            .map_err(|e| PublishError::invalid_response(operation, &e.to_string()))?
            .html_url
            .ok_or_else(|| PublishError::invalid_response(operation, "missing html_url"))
    }

    /// Reads the core API quota.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the request fails.
    pub async fn try_rate_limit(&self) -> Result<RateLimitStatus, PublishError> {
        const OP: &str = "rate limit";
        let response = Self::send(
            OP,
            self.request(Method::GET, format!("{}/rate_limit", self.base_url)),
        )
        .await?;
        let body = response
            .json::<RateLimitResponse>()
            .await
            .map_err(|e| PublishError::invalid_response(OP, &e.to_string()))?;
        Ok(RateLimitStatus {
            remaining: body.rate.remaining,
            reset: body.rate.reset,
            limit: body.rate.limit,
        })
    }

    /// Checks repository access (see [`Publisher::check_repository_access`]).
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the request fails.
    pub async fn try_repository_access(&self) -> Result<bool, PublishError> {
        const OP: &str = "repository access";
        let response = Self::send(OP, self.request(Method::GET, self.repo_url())).await?;
        let info = response
            .json::<RepoInfo>()
            .await
            .map_err(|e| PublishError::invalid_response(OP, &e.to_string()))?;
        debug!(full_name = ?info.full_name, "repository found");

        if self.token.is_some() {
            Ok(info.permissions.push)
        } else {
            Ok(true)
        }
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("repo", &self.repo.to_string())
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Publisher for GitHubClient {
    fn has_token(&self) -> bool {
        self.token.is_some()
    }

    #[tracing::instrument(skip(self, content, message), fields(repo = %self.repo, bytes = content.len()))]
    async fn upload_file(&self, path: &str, content: &str, message: &str, branch: &str) -> bool {
        match self.try_upload_file(path, content, message, branch).await {
            Ok(()) => {
                info!(path, branch, "file uploaded");
                true
            }
            Err(e) => {
                error!(error = %e, "upload failed");
                false
            }
        }
    }

    #[tracing::instrument(skip(self, body), fields(repo = %self.repo))]
    async fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> Option<String> {
        match self.try_create_issue(title, body, labels).await {
            Ok(url) => {
                info!(url = %url, "issue created");
                Some(url)
            }
            Err(e) => {
                error!(error = %e, "issue creation failed");
                None
            }
        }
    }

    #[tracing::instrument(skip(self, body), fields(repo = %self.repo))]
    async fn create_pull_request(&self, head: &str, title: &str, body: &str) -> Option<String> {
        match self.try_create_pull_request(head, title, body).await {
            Ok(url) => {
                info!(url = %url, "pull request created");
                Some(url)
            }
            Err(e) => {
                error!(error = %e, "pull request creation failed");
                None
            }
        }
    }

    async fn check_rate_limit(&self) -> RateLimitStatus {
        match self.try_rate_limit().await {
            Ok(status) => {
                info!(remaining = status.remaining, limit = status.limit, "GitHub rate limit");
                status
            }
            Err(e) => {
                error!(error = %e, "rate limit check failed");
                RateLimitStatus::default()
            }
        }
    }

    async fn check_repository_access(&self) -> bool {
        match self.try_repository_access().await {
            Ok(access) => {
                info!(repo = %self.repo, access, "repository access checked");
                access
            }
            Err(e) => {
                error!(error = %e, "repository access check failed");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn slug() -> RepoSlug {
        "andreixdbolos/proiect-vf".parse().unwrap()
    }

    #[test]
    fn test_blank_token_is_treated_as_missing() {
        let client = GitHubClient::new(Some("   ".to_string()), slug()).unwrap();
        assert!(!client.has_token());
    }

    #[test]
    fn test_contents_url_encodes_segments() {
        let client = GitHubClient::with_base_url("https://api.test/", None, slug()).unwrap();
        assert_eq!(
            client.contents_url("/data/verification tools.json"),
            "https://api.test/repos/andreixdbolos/proiect-vf/contents/data/verification%20tools.json"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let client = GitHubClient::new(Some("secret-token".to_string()), slug()).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("has_token: true"));
    }

    #[tokio::test]
    async fn test_write_operations_without_token_fail_fast() {
        let client = GitHubClient::with_base_url("http://127.0.0.1:9", None, slug()).unwrap();
        assert!(matches!(
            client.try_upload_file("a.json", "{}", "msg", "main").await,
            Err(PublishError::MissingToken { .. })
        ));
        assert!(matches!(
            client.try_create_issue("t", "b", &[]).await,
            Err(PublishError::MissingToken { .. })
        ));
        assert!(matches!(
            client.try_create_pull_request("feature", "t", "b").await,
            Err(PublishError::MissingToken { .. })
        ));
    }
}
