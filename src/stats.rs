//! Aggregate counts over the relational store.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::instrument;

use crate::db::Database;
use crate::storage::StorageError;

/// Row counts by category and by source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_records: i64,
    /// Keyed by the stored category string; rows without one are keyed `""`.
    pub by_category: BTreeMap<String, i64>,
    pub by_source: BTreeMap<String, i64>,
}

/// Computes [`Statistics`] from the current store contents.
///
/// # Errors
///
/// Returns [`StorageError`] if a query fails.
#[instrument(skip(db))]
pub async fn aggregate(db: &Database) -> Result<Statistics, StorageError> {
    let (total_records,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tools")
        .fetch_one(db.pool())
        .await?;

    let by_category = group_counts(db, "SELECT category, COUNT(*) FROM tools GROUP BY category").await?;
    let by_source = group_counts(db, "SELECT source, COUNT(*) FROM tools GROUP BY source").await?;

    Ok(Statistics {
        total_records,
        by_category,
        by_source,
    })
}

async fn group_counts(db: &Database, sql: &str) -> Result<BTreeMap<String, i64>, StorageError> {
    let rows: Vec<(Option<String>, i64)> = sqlx::query_as(sql).fetch_all(db.pool()).await?;
    Ok(rows
        .into_iter()
        .map(|(key, count)| (key.unwrap_or_default(), count))
        .collect())
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total records: {}", self.total_records)?;
        writeln!(f, "By category:")?;
        for (category, count) in &self.by_category {
            writeln!(f, "  {category}: {count}")?;
        }
        writeln!(f, "By source:")?;
        for (source, count) in &self.by_source {
            writeln!(f, "  {source}: {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::ToolStore;
    use crate::tool::{CanonicalTool, Category};

    #[tokio::test]
    async fn test_aggregate_empty_store() {
        let db = Database::new_in_memory().await.unwrap();
        let stats = aggregate(&db).await.unwrap();
        assert_eq!(stats, Statistics::default());
    }

    #[tokio::test]
    async fn test_aggregate_groups_by_category_and_source() {
        let db = Database::new_in_memory().await.unwrap();
        let store = ToolStore::new(db.clone());
        store
            .insert_tools(&[
                CanonicalTool::new("AProVE", Category::Termination, "1"),
                CanonicalTool::new("Ultimate", Category::Termination, "2"),
                CanonicalTool::new("DepQBF", Category::QbfSolver, "3").with_source("github"),
            ])
            .await;

        let stats = aggregate(&db).await.unwrap();
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.by_category.get("termination"), Some(&2));
        assert_eq!(stats.by_category.get("qbf_solver"), Some(&1));
        assert_eq!(stats.by_source.get("zenodo"), Some(&2));
        assert_eq!(stats.by_source.get("github"), Some(&1));

        let rendered = stats.to_string();
        assert!(rendered.contains("Total records: 3"));
        assert!(rendered.contains("termination: 2"));
    }
}
