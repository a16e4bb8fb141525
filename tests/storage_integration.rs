//! Integration tests for the three sinks and store statistics.

use tempfile::TempDir;
use vtools_core::storage::{
    CSV_HEADER, DataDirs, ToolStore, load_json_snapshot, write_csv_snapshot, write_json_snapshot,
};
use vtools_core::{CanonicalTool, Category, Database, stats};

fn sample_tools() -> Vec<CanonicalTool> {
    vec![
        CanonicalTool::new("CBMC", Category::FunctionalCorrectness, "101")
            .with_description("Bounded model checker for C, \"quoted\", with commas")
            .with_doi(Some("10.5281/zenodo.101".to_string()))
            .with_authors(vec!["Kroening, Daniel".to_string()]),
        CanonicalTool::new("AProVE", Category::Termination, "202")
            .with_keywords(vec!["termination".to_string(), "rewriting".to_string()]),
        CanonicalTool::new("DepQBF", Category::QbfSolver, "303"),
    ]
}

async fn open(dirs: &DataDirs) -> ToolStore {
    dirs.ensure().unwrap();
    ToolStore::new(Database::new(&dirs.db_path()).await.unwrap())
}

#[tokio::test]
async fn test_store_survives_reopen_and_stays_idempotent() {
    let temp = TempDir::new().unwrap();
    let dirs = DataDirs::new(temp.path().join("data"));

    let store = open(&dirs).await;
    let first = store.insert_tools(&sample_tools()).await;
    assert_eq!(first.inserted, 3);
    assert_eq!(first.skipped, 0);
    assert!(first.error.is_none());
    store.database().clone().close().await;

    let reopened = open(&dirs).await;
    let second = reopened.insert_tools(&sample_tools()).await;
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(reopened.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_stored_tool_round_trips_through_data_column() {
    let temp = TempDir::new().unwrap();
    let store = open(&DataDirs::new(temp.path())).await;
    let tools = sample_tools();
    store.insert_tools(&tools).await;

    let termination = store
        .query_by_category(Category::Termination, 10)
        .await
        .unwrap();
    assert_eq!(termination, vec![tools[1].clone()]);
}

#[tokio::test]
async fn test_statistics_group_by_category_and_source() {
    let temp = TempDir::new().unwrap();
    let store = open(&DataDirs::new(temp.path())).await;
    let mut tools = sample_tools();
    tools.push(CanonicalTool::new("Z3 wrapper", Category::FunctionalCorrectness, "404").with_source("github"));
    store.insert_tools(&tools).await;

    let summary = stats::aggregate(store.database()).await.unwrap();
    assert_eq!(summary.total_records, 4);
    assert_eq!(summary.by_category.get("functional_correctness"), Some(&2));
    assert_eq!(summary.by_category.get("termination"), Some(&1));
    assert_eq!(summary.by_category.get("complexity_bounds"), None);
    assert_eq!(summary.by_source.get("zenodo"), Some(&3));
    assert_eq!(summary.by_source.get("github"), Some(&1));
}

#[tokio::test]
async fn test_statistics_on_empty_store() {
    let temp = TempDir::new().unwrap();
    let store = open(&DataDirs::new(temp.path())).await;

    let summary = stats::aggregate(store.database()).await.unwrap();
    assert_eq!(summary.total_records, 0);
    assert!(summary.by_category.is_empty());
    assert!(summary.by_source.is_empty());
}

#[tokio::test]
async fn test_backup_contains_every_stored_tool() {
    let temp = TempDir::new().unwrap();
    let dirs = DataDirs::new(temp.path());
    let store = open(&dirs).await;
    store.insert_tools(&sample_tools()).await;

    let path = store.backup(&dirs.backup_dir()).await.unwrap();
    let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("backup_"));
    assert!(file_name.ends_with(".json"));

    let restored = load_json_snapshot(&path).unwrap();
    assert_eq!(restored.len(), 3);
    assert_eq!(store.count().await.unwrap(), 3);
}

#[test]
fn test_json_and_csv_snapshots_agree() {
    let temp = TempDir::new().unwrap();
    let dirs = DataDirs::new(temp.path());
    dirs.ensure().unwrap();
    let tools = sample_tools();

    let json_path = write_json_snapshot(&dirs.json_dir(), &tools).unwrap();
    let csv_path = write_csv_snapshot(&dirs.csv_dir(), &tools).unwrap();

    assert_eq!(load_json_snapshot(&json_path).unwrap(), tools);

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(header, CSV_HEADER.to_vec());

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "CBMC");
    assert_eq!(&rows[0][1], "functional_correctness");
    assert_eq!(&rows[0][2], "Bounded model checker for C, \"quoted\", with commas");
    assert_eq!(&rows[1][8], "termination, rewriting");
}
