//! Session-scoped deduplication of raw hits.
//!
//! One [`CrawlSession`] lives for exactly one crawl run. Every
//! [`super::Crawler`] run starts a fresh session, so two runs never share a
//! seen set.

use std::collections::HashSet;

use tracing::trace;

use crate::record::RawRecord;

/// Set of external identifiers already admitted in the current session.
#[derive(Debug, Default)]
pub struct CrawlSession {
    seen: HashSet<String>,
    duplicates: usize,
}

impl CrawlSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a hit the first time its identifier is seen.
    ///
    /// Returns `false` for hits with an empty identifier and for identifiers
    /// already admitted in this session; only the latter count as duplicates.
    pub fn admit(&mut self, record: &RawRecord) -> bool {
        let id = record.id_string();
        if id.is_empty() {
            trace!("dropping hit without identifier");
            return false;
        }
        if self.seen.insert(id) {
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    /// Whether an identifier has already been admitted.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Number of distinct identifiers admitted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Number of hits rejected because their identifier was already seen.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
