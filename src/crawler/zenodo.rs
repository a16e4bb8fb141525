//! Zenodo records API client.
//!
//! Uses the public `GET /records` search endpoint and `GET /records/{id}`
//! detail endpoint. The `try_*` methods surface a [`CrawlError`]; the
//! [`SearchApi`] implementation logs those errors and degrades to empty
//! results so a failing query never aborts a crawl.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::http_client::{HttpTimeouts, build_http_client};
use super::{CrawlError, SearchApi};
use crate::record::{RawRecord, SearchPage, SearchResponse};
use crate::user_agent::default_user_agent;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://zenodo.org/api";

/// Sort order sent with every search request.
pub const DEFAULT_SORT: &str = "bestmatch";

/// Builds the query string actually submitted to the search endpoint.
///
/// With `software_only`, the user query is conjoined with a resource-type
/// filter so that only software, tools and frameworks match.
#[must_use]
pub fn build_search_query(query: &str, software_only: bool) -> String {
    if software_only {
        format!("({query}) AND (resource_type.type:software OR keywords:tool OR keywords:framework)")
    } else {
        query.to_string()
    }
}

/// HTTP client for the Zenodo records API.
pub struct ZenodoClient {
    client: Client,
    base_url: String,
}

impl ZenodoClient {
    /// Creates a client for the public Zenodo API with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] if HTTP client construction fails.
    #[tracing::instrument]
    pub fn new() -> Result<Self, CrawlError> {
        Self::with_settings(DEFAULT_BASE_URL, HttpTimeouts::default())
    }

    /// Creates a client against a custom API root (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] if HTTP client construction fails.
    #[tracing::instrument(skip_all, fields(base_url))]
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CrawlError> {
        Self::with_settings(base_url, HttpTimeouts::default())
    }

    /// Creates a client with an explicit API root and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] if HTTP client construction fails.
    pub fn with_settings(
        base_url: impl Into<String>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, CrawlError> {
        let client = build_http_client("zenodo", &default_user_agent(), timeouts)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests one page of search results.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] on transport failure, non-success status, or an
    /// undecodable body.
    pub async fn try_search_page(
        &self,
        query: &str,
        size: usize,
        page: usize,
        software_only: bool,
    ) -> Result<SearchPage, CrawlError> {
        let q = build_search_query(query, software_only);
        let size = size.to_string();
        let page = page.to_string();
        let url = Url::parse_with_params(
            &format!("{}/records", self.base_url),
            &[
                ("q", q.as_str()),
                ("size", size.as_str()),
                ("page", page.as_str()),
                ("sort", DEFAULT_SORT),
            ],
        )
        .map_err(|e| CrawlError::request(query, &format!("invalid search URL: {e}")))?;

        debug!(api_url = %url, "Calling Zenodo search API");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CrawlError::request(query, &e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::http_status(query, status.as_u16()));
        }

        let body = response
            .json::<SearchResponse>()
            .await
            .map_err(|e| CrawlError::invalid_response(query, &e.to_string()))?;

        let page = body.hits.into_page();
        if page.skipped > 0 {
            warn!(query, skipped = page.skipped, "search page had undecodable hits");
        }
        Ok(page)
    }

    /// Fetches a single record by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] on transport failure, non-success status, or an
    /// undecodable body.
    pub async fn try_fetch_record(&self, id: &str) -> Result<RawRecord, CrawlError> {
        let url = format!("{}/records/{}", self.base_url, urlencoding::encode(id));
        debug!(api_url = %url, "Calling Zenodo record API");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CrawlError::request(id, &e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::http_status(id, status.as_u16()));
        }

        response
            .json::<RawRecord>()
            .await
            .map_err(|e| CrawlError::invalid_response(id, &e.to_string()))
    }
}

impl std::fmt::Debug for ZenodoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZenodoClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchApi for ZenodoClient {
    #[tracing::instrument(skip(self), fields(source = "zenodo"))]
    async fn search_page(
        &self,
        query: &str,
        size: usize,
        page: usize,
        software_only: bool,
    ) -> SearchPage {
        match self.try_search_page(query, size, page, software_only).await {
            Ok(page) => {
                debug!(hits = page.records.len(), total = ?page.total, "Search page received");
                page
            }
            Err(error) => {
                warn!(error = %error, "Search failed, treating as empty result");
                SearchPage::default()
            }
        }
    }

    #[tracing::instrument(skip(self), fields(source = "zenodo"))]
    async fn fetch_record(&self, id: &str) -> Option<RawRecord> {
        match self.try_fetch_record(id).await {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(error = %error, "Record lookup failed");
                None
            }
        }
    }
}
