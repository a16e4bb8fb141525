//! Verification Tools Core Library
//!
//! Discovers program-verification tools on Zenodo, filters and classifies
//! them, normalizes them into a canonical schema, and archives them as JSON
//! and CSV snapshots plus an append-only SQLite store.
//!
//! # Architecture
//!
//! Data flows leaf-first through these modules:
//! - [`catalog`] - Static search-query catalog
//! - [`crawler`] - Paginated, paced search with session deduplication
//! - [`classify`] - Relevance filter and category assignment
//! - [`normalize`] - Canonical schema mapping and validation
//! - [`storage`] - Snapshots and idempotent relational persistence
//! - [`stats`] - Aggregate counts over the store
//! - [`publish`] - Upload and issue/pull-request integration
//! - [`pipeline`] - Phase orchestration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod classify;
pub mod config;
pub mod crawler;
pub mod db;
pub mod normalize;
pub mod pipeline;
pub mod publish;
pub mod record;
pub mod stats;
pub mod storage;
pub mod tool;
mod user_agent;

// Re-export commonly used types
pub use classify::{ClassifiedHit, categorize, is_relevant};
pub use config::AppConfig;
pub use crawler::{
    CrawlError, CrawlReport, CrawlSession, Crawler, CrawlerSettings, Pacer, QuickReport,
    SearchApi, ZenodoClient,
};
pub use db::{Database, DbError};
pub use normalize::{NormalizeReport, Rejection, ValidationError, normalize_batch};
pub use pipeline::{Pipeline, PipelineReport, StoreOutcome};
pub use publish::{GitHubClient, PublishError, Publisher};
pub use record::RawRecord;
pub use stats::Statistics;
pub use storage::{DataDirs, InsertSummary, StorageError, ToolStore};
pub use tool::{CanonicalTool, Category};
