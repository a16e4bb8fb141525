//! Canonical tool schema and category definitions.
//!
//! A [`CanonicalTool`] is the normalized unit that is exported to snapshots
//! and persisted in the relational store. Fields are private and exposed
//! through accessors so a tool cannot be mutated once it has been built.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed source literal for records discovered through the Zenodo API.
pub const SOURCE_ZENODO: &str = "zenodo";

/// Schema marker stamped into every tool's metadata.
pub const SCHEMA_VERSION: &str = "v1";

/// License value used when the source record carries none.
pub const UNKNOWN_LICENSE: &str = "unknown";

/// Closed set of tool categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Deductive verifiers, model checkers and provers for functional properties.
    FunctionalCorrectness,
    /// Termination provers and analyzers.
    Termination,
    /// Resource and complexity bound inference.
    ComplexityBounds,
    /// Verification of neural networks.
    NeuralNetworkVerification,
    /// Quantified Boolean formula solvers.
    QbfSolver,
    /// Anything that matched no category rule.
    Other,
}

impl Category {
    /// All categories in declaration order.
    pub const ALL: [Category; 6] = [
        Self::FunctionalCorrectness,
        Self::Termination,
        Self::ComplexityBounds,
        Self::NeuralNetworkVerification,
        Self::QbfSolver,
        Self::Other,
    ];

    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FunctionalCorrectness => "functional_correctness",
            Self::Termination => "termination",
            Self::ComplexityBounds => "complexity_bounds",
            Self::NeuralNetworkVerification => "neural_network_verification",
            Self::QbfSolver => "qbf_solver",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "functional_correctness" => Ok(Self::FunctionalCorrectness),
            "termination" => Ok(Self::Termination),
            "complexity_bounds" => Ok(Self::ComplexityBounds),
            "neural_network_verification" => Ok(Self::NeuralNetworkVerification),
            "qbf_solver" => Ok(Self::QbfSolver),
            "other" => Ok(Self::Other),
            _ => Err(format!(
                "invalid category: {s} (expected one of: functional_correctness, termination, \
                 complexity_bounds, neural_network_verification, qbf_solver, other)"
            )),
        }
    }
}

/// Crawl bookkeeping carried alongside a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// When the source record was fetched, if known.
    pub crawled_at: Option<String>,
    /// Resource-type tag reported by the source (e.g. `software`).
    pub resource_type: Option<String>,
    /// Schema marker, see [`SCHEMA_VERSION`].
    pub version: String,
}

impl Default for ToolMetadata {
    fn default() -> Self {
        Self {
            crawled_at: None,
            resource_type: None,
            version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// A normalized, validated tool record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTool {
    name: String,
    description: String,
    category: Category,
    source: String,
    source_id: String,
    doi: Option<String>,
    url: Option<String>,
    license: String,
    authors: Vec<String>,
    keywords: Vec<String>,
    metadata: ToolMetadata,
}

impl CanonicalTool {
    /// Starts a tool from the Zenodo source with the required fields set.
    ///
    /// Optional fields default to empty/absent and `license` to `"unknown"`.
    #[must_use]
    pub fn new(name: impl Into<String>, category: Category, source_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category,
            source: SOURCE_ZENODO.to_string(),
            source_id: source_id.into(),
            doi: None,
            url: None,
            license: UNKNOWN_LICENSE.to_string(),
            authors: Vec::new(),
            keywords: Vec::new(),
            metadata: ToolMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub fn with_doi(mut self, doi: Option<String>) -> Self {
        self.doi = doi;
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    #[must_use]
    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = license.into();
        self
    }

    #[must_use]
    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: ToolMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[must_use]
    pub fn license(&self) -> &str {
        &self.license
    }

    #[must_use]
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[must_use]
    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }
}
