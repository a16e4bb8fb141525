//! Relevance and category classification of raw records.
//!
//! Both decisions work on the lowercased concatenation of title, description
//! and keywords (see [`RawRecord::search_text`]). They are independent:
//! callers categorize every record and keep only the relevant ones.

use tracing::trace;

use crate::record::RawRecord;
use crate::tool::Category;

/// Terms that mark a record as out of domain. Checked before anything else.
pub const EXCLUDED_KEYWORDS: &[&str] = &[
    "patient",
    "clinical",
    "medical",
    "hospital",
    "disease",
    "epidemiolog",
    "genome",
    "genomic",
    "protein",
    "species",
    "biodiversity",
    "ecology",
    "geographic",
    "geospatial",
    "census",
    "questionnaire",
];

/// A single match is enough to mark a record relevant.
pub const STRONG_KEYWORDS: &[&str] = &[
    "verifier",
    "prover",
    "model checker",
    "bounded model checking",
    "smt solver",
    "sat solver",
    "qbf solver",
];

/// At least [`WEAK_KEYWORD_THRESHOLD`] distinct matches are needed.
pub const WEAK_KEYWORDS: &[&str] = &[
    "verification",
    "correctness",
    "termination",
    "complexity",
    "solver",
    "checker",
    "analysis",
    "proof",
    "specification",
    "invariant",
    "assertion",
    "contract",
];

pub const WEAK_KEYWORD_THRESHOLD: usize = 2;

/// A raw record that passed deduplication and relevance, with its category.
#[derive(Debug, Clone)]
pub struct ClassifiedHit {
    pub record: RawRecord,
    pub category: Category,
}

impl ClassifiedHit {
    /// Categorizes a record without checking relevance.
    #[must_use]
    pub fn categorized(record: RawRecord) -> Self {
        let category = categorize(&record);
        Self { record, category }
    }
}

/// Decides whether a record belongs to the verification-tool domain.
///
/// Precedence chain: any excluded term rejects, then any strong keyword
/// accepts, then the number of distinct weak keywords must reach the threshold.
#[must_use]
pub fn is_relevant(record: &RawRecord) -> bool {
    is_relevant_text(&record.search_text())
}

/// [`is_relevant`] over an already lowercased text.
#[must_use]
pub fn is_relevant_text(text: &str) -> bool {
    if let Some(term) = EXCLUDED_KEYWORDS.iter().find(|term| text.contains(*term)) {
        trace!(term = *term, "excluded term present");
        return false;
    }

    if STRONG_KEYWORDS.iter().any(|term| text.contains(term)) {
        return true;
    }

    let weak_hits = WEAK_KEYWORDS
        .iter()
        .filter(|term| text.contains(*term))
        .count();
    weak_hits >= WEAK_KEYWORD_THRESHOLD
}

/// Assigns exactly one category; the first matching rule wins.
#[must_use]
pub fn categorize(record: &RawRecord) -> Category {
    categorize_text(&record.search_text())
}

/// [`categorize`] over an already lowercased text.
#[must_use]
pub fn categorize_text(text: &str) -> Category {
    let has = |terms: &[&str]| terms.iter().any(|term| text.contains(term));

    if has(&["neural", "deep learning"]) {
        Category::NeuralNetworkVerification
    } else if has(&["termination"]) {
        Category::Termination
    } else if has(&["complexity", "bounds"]) {
        Category::ComplexityBounds
    } else if has(&["qbf", "boolean"]) {
        Category::QbfSolver
    } else if has(&["correctness", "verification"]) {
        Category::FunctionalCorrectness
    } else {
        Category::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion_beats_strong_keyword() {
        assert!(!is_relevant_text("a verifier for clinical trial protocols"));
    }

    #[test]
    fn test_strong_keyword_alone_is_relevant() {
        assert!(is_relevant_text("cbmc bounded model checker"));
        assert!(is_relevant_text("an smt solver"));
    }

    #[test]
    fn test_single_weak_keyword_is_not_relevant() {
        assert!(!is_relevant_text("a tool for data analysis"));
    }

    #[test]
    fn test_two_distinct_weak_keywords_are_relevant() {
        assert!(is_relevant_text("static analysis with proof output"));
    }

    #[test]
    fn test_repeated_weak_keyword_counts_once() {
        assert!(!is_relevant_text("analysis of analysis results"));
    }

    #[test]
    fn test_no_keywords_is_not_relevant() {
        assert!(!is_relevant_text("a photo collection"));
    }

    #[test]
    fn test_category_neural_wins_over_termination() {
        assert_eq!(
            categorize_text("neural network termination checker"),
            Category::NeuralNetworkVerification
        );
    }

    #[test]
    fn test_category_rule_order() {
        assert_eq!(categorize_text("deep learning"), Category::NeuralNetworkVerification);
        assert_eq!(categorize_text("termination and complexity"), Category::Termination);
        assert_eq!(categorize_text("upper bounds on qbf"), Category::ComplexityBounds);
        assert_eq!(categorize_text("boolean verification"), Category::QbfSolver);
        assert_eq!(categorize_text("correctness proofs"), Category::FunctionalCorrectness);
        assert_eq!(categorize_text("a spreadsheet"), Category::Other);
    }

    #[test]
    fn test_categorize_applies_even_when_irrelevant() {
        let text = "patient termination survey";
        assert!(!is_relevant_text(text));
        assert_eq!(categorize_text(text), Category::Termination);
    }
}
