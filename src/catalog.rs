//! Static search-query catalog.
//!
//! Maps each crawl category to the human-authored queries issued for it.
//! Order matters: categories and queries are executed in the order listed
//! here, and a record found by several queries is attributed to the first.

use crate::tool::Category;

/// One catalog entry: a category and the queries searched for it.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub category: Category,
    pub queries: &'static [&'static str],
}

/// Default catalog used by full crawls.
pub const DEFAULT_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        category: Category::FunctionalCorrectness,
        queries: &[
            "program verification tool",
            "deductive verifier",
            "bounded model checking",
            "software model checker",
            "functional correctness verification",
        ],
    },
    CatalogEntry {
        category: Category::Termination,
        queries: &[
            "termination analysis",
            "termination prover",
            "ranking function synthesis",
        ],
    },
    CatalogEntry {
        category: Category::ComplexityBounds,
        queries: &[
            "complexity bounds analysis",
            "resource bound analysis",
            "cost analysis program",
        ],
    },
    CatalogEntry {
        category: Category::NeuralNetworkVerification,
        queries: &[
            "neural network verification",
            "DNN verifier",
            "robustness verification deep learning",
        ],
    },
    CatalogEntry {
        category: Category::QbfSolver,
        queries: &["QBF solver", "quantified boolean formula solver"],
    },
];

/// Fixed query list for quick, unfiltered crawls.
pub const QUICK_QUERIES: [&str; 5] = [
    "verification tools",
    "functional correctness",
    "termination analysis",
    "complexity bounds",
    "QBF solver",
];

/// Returns the catalog entries for the given categories, preserving catalog order.
///
/// An empty filter selects the whole catalog.
#[must_use]
pub fn select(categories: &[Category]) -> Vec<CatalogEntry> {
    DEFAULT_CATALOG
        .iter()
        .filter(|entry| categories.is_empty() || categories.contains(&entry.category))
        .copied()
        .collect()
}
