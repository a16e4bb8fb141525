//! Crawling of the external search API.
//!
//! The [`Crawler`] walks the query catalog through a [`SearchApi`]
//! implementation, deduplicates hits in a [`CrawlSession`], and classifies the
//! survivors. Requests are issued strictly one after another with fixed
//! [`Pacer`] delays in between.
//!
//! # Example
//!
//! ```no_run
//! use vtools_core::crawler::{Crawler, CrawlerSettings, Pacer, ZenodoClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = ZenodoClient::new()?;
//! let crawler = Crawler::new(Box::new(api), Pacer::default(), CrawlerSettings::default());
//! let report = crawler.run(&[]).await;
//! println!("{} relevant hits", report.hits.len());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod http_client;
mod pacing;
mod session;
mod zenodo;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument};

pub use error::CrawlError;
pub use http_client::{HttpTimeouts, build_http_client};
pub use pacing::{DEFAULT_QUERY_DELAY_MS, DEFAULT_REQUEST_DELAY_MS, Pacer};
pub use session::CrawlSession;
pub use zenodo::{DEFAULT_BASE_URL, ZenodoClient, build_search_query};

use crate::catalog::{self, CatalogEntry, QUICK_QUERIES};
use crate::classify::{self, ClassifiedHit};
use crate::record::{RawRecord, SearchPage};
use crate::tool::Category;

/// Timestamp format stamped on admitted records.
pub const CRAWLED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default page size for paginated searches.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Default number of results requested per catalog query.
pub const DEFAULT_PER_QUERY_SIZE: usize = 10;

/// Default cap on results collected for a single paginated query.
pub const DEFAULT_MAX_RESULTS_PER_QUERY: usize = 100;

/// Search capability consumed by the crawler.
///
/// Implementations never fail: transport and status errors are logged and
/// reported as an empty page, which callers read as "no more data".
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Requests one page (1-based) of results for a query.
    async fn search_page(
        &self,
        query: &str,
        size: usize,
        page: usize,
        software_only: bool,
    ) -> SearchPage;

    /// Requests one page and keeps only the records.
    async fn search(
        &self,
        query: &str,
        size: usize,
        page: usize,
        software_only: bool,
    ) -> Vec<RawRecord> {
        self.search_page(query, size, page, software_only)
            .await
            .records
    }

    /// Fetches one record by identifier; `None` on any failure.
    async fn fetch_record(&self, id: &str) -> Option<RawRecord>;
}

/// Tunables for a crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerSettings {
    /// Page size used by [`Crawler::search_with_pagination`].
    pub page_size: usize,
    /// Result count requested by each catalog query in a single-page crawl.
    pub per_query_size: usize,
    /// Cap applied when paginating one query.
    pub max_results_per_query: usize,
    /// Conjoin the software resource-type filter to every query.
    pub software_only: bool,
    /// Paginate each catalog query instead of requesting a single page.
    pub paginate: bool,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            per_query_size: DEFAULT_PER_QUERY_SIZE,
            max_results_per_query: DEFAULT_MAX_RESULTS_PER_QUERY,
            software_only: true,
            paginate: false,
        }
    }
}

/// An accepted hit plus the catalog query that first found it.
#[derive(Debug, Clone)]
pub struct CrawlHit {
    pub hit: ClassifiedHit,
    /// Category whose query list produced the hit first.
    pub query_category: Category,
    pub query: String,
}

/// Outcome of a full categorized crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Unique, relevant hits in discovery order.
    pub hits: Vec<CrawlHit>,
    /// Relevant hits per query category, counting first assignment only.
    pub attribution: BTreeMap<Category, usize>,
    pub dropped_duplicate: usize,
    pub dropped_irrelevant: usize,
    pub queries_issued: usize,
    /// Largest total-count hint reported by any query.
    pub max_total_hint: Option<u64>,
}

impl CrawlReport {
    /// Classified hits in discovery order, ready for normalization.
    #[must_use]
    pub fn classified_hits(&self) -> Vec<ClassifiedHit> {
        self.hits.iter().map(|h| h.hit.clone()).collect()
    }
}

/// Outcome of a quick, unfiltered crawl.
#[derive(Debug, Clone, Default)]
pub struct QuickReport {
    /// Unique raw hits in discovery order.
    pub records: Vec<RawRecord>,
    pub dropped_duplicate: usize,
    pub queries_issued: usize,
}

/// Sequential crawler over a [`SearchApi`].
pub struct Crawler {
    api: Box<dyn SearchApi>,
    pacer: Pacer,
    settings: CrawlerSettings,
}

impl Crawler {
    #[must_use]
    pub fn new(api: Box<dyn SearchApi>, pacer: Pacer, settings: CrawlerSettings) -> Self {
        Self {
            api,
            pacer,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CrawlerSettings {
        &self.settings
    }

    /// Fetches a single record through the underlying API.
    pub async fn fetch_record(&self, id: &str) -> Option<RawRecord> {
        self.api.fetch_record(id).await
    }

    /// Collects up to `max_results` records for one query, page by page.
    ///
    /// Stops after a page shorter than the configured page size (including an
    /// empty page from a failed request) or once `max_results` is reached.
    #[instrument(skip(self))]
    pub async fn search_with_pagination(&self, query: &str, max_results: usize) -> Vec<RawRecord> {
        self.collect_pages(query, max_results).await.records
    }

    async fn collect_pages(&self, query: &str, max_results: usize) -> SearchPage {
        let page_size = self.settings.page_size;
        let mut collected = SearchPage::default();
        if max_results == 0 || page_size == 0 {
            return collected;
        }

        let mut page = 1;
        loop {
            let batch = self
                .api
                .search_page(query, page_size, page, self.settings.software_only)
                .await;
            let returned = batch.returned();
            collected.total = collected.total.max(batch.total);
            collected.skipped += batch.skipped;
            collected.records.extend(batch.records);

            debug!(query, page, returned, collected = collected.records.len(), "page collected");

            if returned < page_size || collected.records.len() >= max_results {
                break;
            }
            page += 1;
            self.pacer.before_next_page().await;
        }

        collected.records.truncate(max_results);
        collected
    }

    async fn query_once(&self, query: &str) -> SearchPage {
        if self.settings.paginate {
            self.collect_pages(query, self.settings.max_results_per_query)
                .await
        } else {
            self.api
                .search_page(
                    query,
                    self.settings.per_query_size,
                    1,
                    self.settings.software_only,
                )
                .await
        }
    }

    /// Runs the catalog queries for `categories` (all when empty).
    ///
    /// Every hit is deduplicated before classification, so a record matched
    /// by several queries is attributed to the first query that found it.
    pub async fn run(&self, categories: &[Category]) -> CrawlReport {
        self.run_catalog(&catalog::select(categories)).await
    }

    /// Runs an explicit list of catalog entries in order.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub async fn run_catalog(&self, entries: &[CatalogEntry]) -> CrawlReport {
        let mut session = CrawlSession::new();
        let mut report = CrawlReport::default();

        for entry in entries {
            for query in entry.queries {
                if report.queries_issued > 0 {
                    self.pacer.before_next_query().await;
                }
                let page = self.query_once(query).await;
                report.queries_issued += 1;
                report.max_total_hint = report.max_total_hint.max(page.total);

                let mut kept = 0usize;
                for mut record in page.records {
                    if !session.admit(&record) {
                        continue;
                    }
                    stamp_crawled_at(&mut record);

                    let hit = ClassifiedHit::categorized(record);
                    if !classify::is_relevant(&hit.record) {
                        report.dropped_irrelevant += 1;
                        continue;
                    }

                    *report.attribution.entry(entry.category).or_insert(0) += 1;
                    kept += 1;
                    report.hits.push(CrawlHit {
                        hit,
                        query_category: entry.category,
                        query: (*query).to_string(),
                    });
                }

                info!(category = %entry.category, query, kept, "query finished");
            }
        }

        report.dropped_duplicate = session.duplicates();
        info!(
            hits = report.hits.len(),
            duplicates = report.dropped_duplicate,
            irrelevant = report.dropped_irrelevant,
            queries = report.queries_issued,
            "crawl finished"
        );
        report
    }

    /// Runs the fixed quick query list with deduplication only.
    #[instrument(skip(self))]
    pub async fn run_quick(&self) -> QuickReport {
        let mut session = CrawlSession::new();
        let mut report = QuickReport::default();

        for query in QUICK_QUERIES {
            if report.queries_issued > 0 {
                self.pacer.before_next_query().await;
            }
            let records = self
                .api
                .search(
                    query,
                    self.settings.per_query_size,
                    1,
                    self.settings.software_only,
                )
                .await;
            report.queries_issued += 1;

            for mut record in records {
                if session.admit(&record) {
                    stamp_crawled_at(&mut record);
                    report.records.push(record);
                }
            }
        }

        report.dropped_duplicate = session.duplicates();
        info!(
            records = report.records.len(),
            duplicates = report.dropped_duplicate,
            "quick crawl finished"
        );
        report
    }
}

fn stamp_crawled_at(record: &mut RawRecord) {
    if record.crawled_at.is_none() {
        record.crawled_at = Some(Utc::now().format(CRAWLED_AT_FORMAT).to_string());
    }
}
