//! Crawl → parse → store → upload orchestration.
//!
//! Each phase is callable on its own; [`Pipeline::run_full`] chains them.
//! Snapshot and database failures propagate, upload failures are reported
//! in the returned [`PipelineReport`] and never retried.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::classify::ClassifiedHit;
use crate::config::AppConfig;
use crate::crawler::{CrawlReport, Crawler, ZenodoClient};
use crate::db::Database;
use crate::normalize::{NormalizeReport, Rejection, normalize_batch};
use crate::publish::{
    DEFAULT_BATCH_SIZE, DEFAULT_BRANCH, GitHubClient, Publisher, RateLimitStatus, batch_into,
};
use crate::stats::{self, Statistics};
use crate::storage::{DataDirs, StorageError, ToolStore, write_csv_snapshot, write_json_snapshot};
use crate::tool::CanonicalTool;

/// Commit message used for data uploads.
pub const UPLOAD_COMMIT_MESSAGE: &str = "Update verification tools data from Zenodo crawl";

/// Where uploads land in the remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub path: String,
    pub branch: String,
}

impl Default for UploadTarget {
    fn default() -> Self {
        Self {
            path: crate::config::DEFAULT_UPLOAD_PATH.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

/// Result of the store phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreOutcome {
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
    /// New rows committed to the relational store.
    pub inserted: usize,
    /// Tools whose natural key already existed.
    pub skipped: usize,
    /// Error that interrupted the database insert, if any.
    pub db_error: Option<String>,
}

/// Result of the upload phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadOutcome {
    pub uploaded_path: Option<String>,
    pub pull_request: Option<String>,
    pub batches: usize,
}

/// Summary of a full pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    /// Unique hits admitted by the crawl session.
    pub crawled: usize,
    pub dropped_irrelevant: usize,
    pub dropped_duplicate: usize,
    /// Tools that passed validation.
    pub parsed: usize,
    pub rejected: Vec<Rejection>,
    pub storage: StoreOutcome,
    pub upload: UploadOutcome,
    pub stats: Statistics,
}

/// Result of a quick, unfiltered run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuickOutcome {
    pub crawled: usize,
    pub parsed: usize,
    pub rejected: Vec<Rejection>,
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
}

/// Wires crawler, store and publisher together.
pub struct Pipeline {
    crawler: Crawler,
    store: ToolStore,
    dirs: DataDirs,
    publisher: Option<Box<dyn Publisher>>,
    upload: UploadTarget,
}

impl Pipeline {
    #[must_use]
    pub fn new(crawler: Crawler, store: ToolStore, dirs: DataDirs) -> Self {
        Self {
            crawler,
            store,
            dirs,
            publisher: None,
            upload: UploadTarget::default(),
        }
    }

    #[must_use]
    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>, upload: UploadTarget) -> Self {
        self.publisher = Some(publisher);
        self.upload = upload;
        self
    }

    /// Builds the production pipeline: Zenodo search, SQLite store under the
    /// data directory, and a GitHub publisher.
    ///
    /// # Errors
    ///
    /// Fails when the data directory, database or an HTTP client cannot be set up.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let dirs = config.data_dirs();
        dirs.ensure()?;
        let db = Database::new(&dirs.db_path())
            .await
            .with_context(|| format!("Failed to open database {}", dirs.db_path().display()))?;

        let api = ZenodoClient::with_settings(&config.api_base_url, config.http_timeouts())?;
        let crawler = Crawler::new(Box::new(api), config.pacer(), config.crawler_settings());

        let github = GitHubClient::with_settings(
            crate::publish::DEFAULT_API_URL,
            config.github_token.clone(),
            config.repo_slug()?,
            config.http_timeouts(),
        )?;
        let upload = UploadTarget {
            path: config.upload_path.clone(),
            branch: config.github_branch.clone(),
        };

        Ok(Self::new(crawler, ToolStore::new(db), dirs).with_publisher(Box::new(github), upload))
    }

    #[must_use]
    pub fn store(&self) -> &ToolStore {
        &self.store
    }

    #[must_use]
    pub fn dirs(&self) -> &DataDirs {
        &self.dirs
    }

    /// Crawl phase over the whole catalog.
    #[instrument(skip(self))]
    pub async fn run_crawl(&self) -> CrawlReport {
        let report = self.crawler.run(&[]).await;
        info!(hits = report.hits.len(), "crawl phase complete");
        report
    }

    /// Parse phase: standardize and validate.
    #[instrument(skip_all, fields(hits = hits.len()))]
    pub fn run_parse(&self, hits: &[ClassifiedHit]) -> NormalizeReport {
        let report = normalize_batch(hits);
        info!(
            parsed = report.accepted.len(),
            rejected = report.rejected.len(),
            categories = ?report.category_counts(),
            "parse phase complete"
        );
        if !report.rejected.is_empty() {
            warn!(errors = report.rejected.len(), "records failed validation");
        }
        report
    }

    /// Store phase: JSON snapshot, CSV snapshot, then relational insert.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when a directory or snapshot cannot be written.
    /// Database insert failures are reported in [`StoreOutcome::db_error`].
    #[instrument(skip_all, fields(tools = tools.len()))]
    pub async fn run_store(&self, tools: &[CanonicalTool]) -> Result<StoreOutcome, StorageError> {
        self.dirs.ensure()?;
        let json_path = write_json_snapshot(&self.dirs.json_dir(), tools)?;
        let csv_path = write_csv_snapshot(&self.dirs.csv_dir(), tools)?;
        let summary = self.store.insert_tools(tools).await;

        Ok(StoreOutcome {
            json_path,
            csv_path,
            inserted: summary.inserted,
            skipped: summary.skipped,
            db_error: summary.error,
        })
    }

    /// Upload phase. Skipped without a token and in dry-run mode.
    ///
    /// Uploading to a branch other than the default one also opens a pull
    /// request into the default branch.
    #[instrument(skip_all, fields(tools = tools.len(), dry_run = dry_run))]
    pub async fn run_upload(&self, tools: &[CanonicalTool], dry_run: bool) -> UploadOutcome {
        let mut outcome = UploadOutcome::default();

        let Some(publisher) = self.publisher.as_deref().filter(|p| p.has_token()) else {
            warn!("No GitHub token provided, skipping upload");
            return outcome;
        };
        if dry_run {
            info!("Dry run mode, not uploading");
            return outcome;
        }

        outcome.batches = batch_into(tools, DEFAULT_BATCH_SIZE).len();
        let content = match serde_json::to_string_pretty(tools) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "could not serialize tools for upload");
                return outcome;
            }
        };

        let target = &self.upload;
        if !publisher
            .upload_file(&target.path, &content, UPLOAD_COMMIT_MESSAGE, &target.branch)
            .await
        {
            warn!(path = %target.path, "upload failed");
            return outcome;
        }
        outcome.uploaded_path = Some(target.path.clone());

        if target.branch != DEFAULT_BRANCH {
            let body = format!("Automated update of `{}` with {} tools.", target.path, tools.len());
            outcome.pull_request = publisher
                .create_pull_request(&target.branch, UPLOAD_COMMIT_MESSAGE, &body)
                .await;
        }
        outcome
    }

    /// Runs every phase in order and aggregates store statistics.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the store phase or statistics fail.
    #[instrument(skip(self))]
    pub async fn run_full(&self, dry_run: bool) -> Result<PipelineReport, StorageError> {
        info!("Starting verification tools pipeline");

        let crawl = self.run_crawl().await;
        let parsed = self.run_parse(&crawl.classified_hits());
        let storage = self.run_store(&parsed.accepted).await?;
        let upload = self.run_upload(&parsed.accepted, dry_run).await;
        let stats = stats::aggregate(self.store.database()).await?;

        let report = PipelineReport {
            crawled: crawl.hits.len() + crawl.dropped_irrelevant,
            dropped_irrelevant: crawl.dropped_irrelevant,
            dropped_duplicate: crawl.dropped_duplicate,
            parsed: parsed.accepted.len(),
            rejected: parsed.rejected,
            storage,
            upload,
            stats,
        };
        info!(
            crawled = report.crawled,
            parsed = report.parsed,
            inserted = report.storage.inserted,
            "Pipeline completed"
        );
        Ok(report)
    }

    /// Quick crawl without relevance filtering, written to snapshots only.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when a snapshot cannot be written.
    #[instrument(skip(self))]
    pub async fn run_quick(&self) -> Result<QuickOutcome, StorageError> {
        let quick = self.crawler.run_quick().await;
        let crawled = quick.records.len();
        let hits: Vec<ClassifiedHit> = quick
            .records
            .into_iter()
            .map(ClassifiedHit::categorized)
            .collect();
        let parsed = self.run_parse(&hits);

        self.dirs.ensure()?;
        let json_path = write_json_snapshot(&self.dirs.json_dir(), &parsed.accepted)?;
        let csv_path = write_csv_snapshot(&self.dirs.csv_dir(), &parsed.accepted)?;

        Ok(QuickOutcome {
            crawled,
            parsed: parsed.accepted.len(),
            rejected: parsed.rejected,
            json_path,
            csv_path,
        })
    }

    /// Opens an issue summarizing a run. `None` without a publisher or on failure.
    pub async fn open_summary_issue(&self, report: &PipelineReport) -> Option<String> {
        let publisher = self.publisher.as_deref()?;
        let title = format!("Verification tools crawl: {} new tools", report.storage.inserted);
        let mut body = format!(
            "Crawled {} records, kept {} tools ({} irrelevant, {} invalid).\n\n",
            report.crawled,
            report.parsed,
            report.dropped_irrelevant,
            report.rejected.len()
        );
        for (category, count) in &report.stats.by_category {
            body.push_str(&format!("- {category}: {count}\n"));
        }
        publisher.create_issue(&title, &body, &[]).await
    }

    /// Rate limit and access of the configured repository.
    pub async fn repository_status(&self) -> Option<(RateLimitStatus, bool)> {
        let publisher = self.publisher.as_deref()?;
        let rate = publisher.check_rate_limit().await;
        let access = publisher.check_repository_access().await;
        Some((rate, access))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::crawler::{CrawlerSettings, Pacer, SearchApi};
    use crate::record::{RawRecord, SearchPage};

    struct OneQueryApi(Vec<RawRecord>);

    #[async_trait]
    impl SearchApi for OneQueryApi {
        async fn search_page(&self, query: &str, _: usize, _: usize, _: bool) -> SearchPage {
            let records = if query == "program verification tool" || query == "verification tools" {
                self.0.clone()
            } else {
                Vec::new()
            };
            SearchPage {
                records,
                ..SearchPage::default()
            }
        }

        async fn fetch_record(&self, _id: &str) -> Option<RawRecord> {
            None
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        token: bool,
        uploads: Arc<Mutex<Vec<(String, String)>>>,
        pulls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        fn has_token(&self) -> bool {
            self.token
        }
        async fn upload_file(&self, path: &str, _content: &str, _message: &str, branch: &str) -> bool {
            self.uploads
                .lock()
                .unwrap()
                .push((path.to_string(), branch.to_string()));
            true
        }
        async fn create_issue(&self, _: &str, _: &str, _: &[String]) -> Option<String> {
            Some("https://example.test/issues/1".to_string())
        }
        async fn create_pull_request(&self, head: &str, _: &str, _: &str) -> Option<String> {
            self.pulls.lock().unwrap().push(head.to_string());
            Some("https://example.test/pull/2".to_string())
        }
        async fn check_rate_limit(&self) -> RateLimitStatus {
            RateLimitStatus::default()
        }
        async fn check_repository_access(&self) -> bool {
            self.token
        }
    }

    fn records() -> Vec<RawRecord> {
        vec![
            serde_json::from_value(json!({
                "id": 1,
                "metadata": {"title": "Frama-C", "description": "deductive verifier"}
            }))
            .unwrap(),
        ]
    }

    async fn pipeline(dir: &std::path::Path) -> Pipeline {
        let crawler = Crawler::new(
            Box::new(OneQueryApi(records())),
            Pacer::disabled(),
            CrawlerSettings::default(),
        );
        let store = ToolStore::new(Database::new_in_memory().await.unwrap());
        Pipeline::new(crawler, store, DataDirs::new(dir))
    }

    fn tools() -> Vec<CanonicalTool> {
        vec![CanonicalTool::new("Frama-C", crate::tool::Category::FunctionalCorrectness, "1")]
    }

    #[tokio::test]
    async fn test_upload_skipped_without_publisher_or_token() {
        let dir = tempfile::tempdir().unwrap();
        let bare = pipeline(dir.path()).await;
        assert!(bare.run_upload(&tools(), false).await.uploaded_path.is_none());

        let publisher = RecordingPublisher::default();
        let uploads = Arc::clone(&publisher.uploads);
        let no_token = pipeline(dir.path())
            .await
            .with_publisher(Box::new(publisher), UploadTarget::default());
        assert!(no_token.run_upload(&tools(), false).await.uploaded_path.is_none());
        assert!(uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_skipped_in_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = RecordingPublisher {
            token: true,
            ..RecordingPublisher::default()
        };
        let uploads = Arc::clone(&publisher.uploads);
        let pipeline = pipeline(dir.path())
            .await
            .with_publisher(Box::new(publisher), UploadTarget::default());

        assert!(pipeline.run_upload(&tools(), true).await.uploaded_path.is_none());
        assert!(uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_upload_to_feature_branch_opens_pull_request() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = RecordingPublisher {
            token: true,
            ..RecordingPublisher::default()
        };
        let uploads = Arc::clone(&publisher.uploads);
        let pulls = Arc::clone(&publisher.pulls);
        let target = UploadTarget {
            path: "data/verification_tools.json".to_string(),
            branch: "crawl-update".to_string(),
        };
        let pipeline = pipeline(dir.path())
            .await
            .with_publisher(Box::new(publisher), target);

        let outcome = pipeline.run_upload(&tools(), false).await;
        assert_eq!(outcome.uploaded_path.as_deref(), Some("data/verification_tools.json"));
        assert_eq!(outcome.batches, 1);
        assert!(outcome.pull_request.is_some());
        assert_eq!(uploads.lock().unwrap()[0].1, "crawl-update");
        assert_eq!(pulls.lock().unwrap().as_slice(), ["crawl-update"]);
    }

    #[tokio::test]
    async fn test_run_full_is_idempotent_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path()).await;

        let first = pipeline.run_full(true).await.unwrap();
        let second = pipeline.run_full(true).await.unwrap();

        assert_eq!(first.parsed, 1);
        assert_eq!(first.storage.inserted, 1);
        assert_eq!(second.storage.inserted, 0);
        assert_eq!(second.storage.skipped, 1);
        assert_eq!(second.stats.total_records, 1);
        assert!(first.storage.json_path.exists());
        assert!(first.storage.csv_path.exists());
    }

    #[tokio::test]
    async fn test_run_quick_writes_snapshots_only() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path()).await;

        let outcome = pipeline.run_quick().await.unwrap();

        assert_eq!(outcome.crawled, 1);
        assert_eq!(outcome.parsed, 1);
        assert!(outcome.json_path.exists());
        assert_eq!(pipeline.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_summary_issue_requires_publisher() {
        let dir = tempfile::tempdir().unwrap();
        let bare = pipeline(dir.path()).await;
        assert!(bare.open_summary_issue(&PipelineReport::default()).await.is_none());
        assert!(bare.repository_status().await.is_none());
    }
}
