//! Normalization of raw records into the canonical tool schema.
//!
//! Each record yields either an accepted [`CanonicalTool`] or a [`Rejection`];
//! a rejected record never aborts the batch and is not retried.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::classify::ClassifiedHit;
use crate::record::{Creator, RawRecord};
use crate::tool::{CanonicalTool, Category, SCHEMA_VERSION, SOURCE_ZENODO, ToolMetadata, UNKNOWN_LICENSE};

/// Descriptions longer than this many characters are truncated.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Marker appended to truncated descriptions.
pub const ELLIPSIS: &str = "...";

/// Minimum accepted tool name length, in characters.
pub const MIN_NAME_CHARS: usize = 3;

#[allow(clippy::expect_used)]
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<]+?>").expect("HTML tag regex is valid")); // Static pattern, safe to panic

/// Reasons a standardized tool fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The record had no usable title.
    #[error("tool name is empty\n  Suggestion: The source record has no title")]
    EmptyName,

    /// The title is too short to identify a tool.
    #[error("tool name '{name}' is shorter than {} characters", MIN_NAME_CHARS)]
    NameTooShort {
        /// The trimmed name that was rejected
        name: String,
    },

    /// The source literal is missing.
    #[error("tool source is empty")]
    EmptySource,
}

/// A record dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Record identifier, or `"unknown"` when the record had none.
    pub record_id: String,
    /// Record title when present.
    pub title: Option<String>,
    /// Human-readable reason.
    pub reason: String,
}

/// Outcome of normalizing a batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub accepted: Vec<CanonicalTool>,
    pub rejected: Vec<Rejection>,
}

impl NormalizeReport {
    /// Number of accepted tools per category.
    #[must_use]
    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for tool in &self.accepted {
            *counts.entry(tool.category()).or_insert(0) += 1;
        }
        counts
    }
}

/// Strips HTML tags, trims, and truncates to [`MAX_DESCRIPTION_CHARS`].
///
/// Text over the limit keeps its first 497 characters followed by `"..."`,
/// for exactly 500 characters in total.
#[must_use]
pub fn clean_description(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let stripped = HTML_TAG.replace_all(raw, "");
    let cleaned = stripped.trim();

    if cleaned.chars().count() > MAX_DESCRIPTION_CHARS {
        let keep = MAX_DESCRIPTION_CHARS - ELLIPSIS.len();
        let mut truncated: String = cleaned.chars().take(keep).collect();
        truncated.push_str(ELLIPSIS);
        truncated
    } else {
        cleaned.to_string()
    }
}

/// Collects creator display names, skipping entries without a name.
#[must_use]
pub fn extract_authors(creators: &[Creator]) -> Vec<String> {
    creators
        .iter()
        .filter_map(|creator| creator.name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Maps a raw record into the canonical schema under the given category.
#[must_use]
pub fn standardize(record: &RawRecord, category: Category) -> CanonicalTool {
    let metadata = ToolMetadata {
        crawled_at: record.crawled_at.clone(),
        resource_type: record.resource_type(),
        version: SCHEMA_VERSION.to_string(),
    };

    CanonicalTool::new(record.title().trim(), category, record.id_string())
        .with_source(SOURCE_ZENODO)
        .with_description(clean_description(record.description()))
        .with_doi(record.doi.clone().filter(|doi| !doi.trim().is_empty()))
        .with_url(record.links.self_link.clone())
        .with_license(record.license_id().unwrap_or_else(|| UNKNOWN_LICENSE.to_string()))
        .with_authors(extract_authors(&record.metadata.creators))
        .with_keywords(record.keywords().to_vec())
        .with_metadata(metadata)
}

/// Checks the required fields of a standardized tool.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate(tool: &CanonicalTool) -> Result<(), ValidationError> {
    if tool.name().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if tool.source().is_empty() {
        return Err(ValidationError::EmptySource);
    }
    if tool.name().chars().count() < MIN_NAME_CHARS {
        return Err(ValidationError::NameTooShort {
            name: tool.name().to_string(),
        });
    }
    Ok(())
}

/// Standardizes and validates one classified hit.
///
/// # Errors
///
/// Returns a [`Rejection`] when validation fails.
pub fn normalize_hit(hit: &ClassifiedHit) -> Result<CanonicalTool, Rejection> {
    let tool = standardize(&hit.record, hit.category);
    match validate(&tool) {
        Ok(()) => Ok(tool),
        Err(error) => {
            let record_id = hit.record.id_string();
            Err(Rejection {
                record_id: if record_id.is_empty() {
                    "unknown".to_string()
                } else {
                    record_id
                },
                title: hit.record.metadata.title.clone(),
                reason: error.to_string(),
            })
        }
    }
}

/// Normalizes a batch, collecting accepted tools and rejections.
#[instrument(skip(hits), fields(count = hits.len()))]
pub fn normalize_batch(hits: &[ClassifiedHit]) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    for hit in hits {
        match normalize_hit(hit) {
            Ok(tool) => {
                debug!(source_id = tool.source_id(), category = %tool.category(), "Accepted tool");
                report.accepted.push(tool);
            }
            Err(rejection) => {
                warn!(
                    record_id = %rejection.record_id,
                    reason = %rejection.reason,
                    "Dropping invalid record"
                );
                report.rejected.push(rejection);
            }
        }
    }

    report
}
