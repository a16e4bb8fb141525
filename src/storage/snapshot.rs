//! Full, timestamped JSON and CSV snapshots of a tool list.
//!
//! Snapshots never deduplicate against earlier files: every call writes a new
//! complete file named `tools_<YYYYMMDD_HHMMSS>.{json,csv}`. Two snapshots in
//! the same second share a name and the later one replaces the earlier.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::{info, instrument};

use super::StorageError;
use crate::tool::CanonicalTool;

/// File-name timestamp format, second resolution.
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Character limit for descriptions in CSV exports.
pub const CSV_DESCRIPTION_CHARS: usize = 200;

/// Fixed CSV column order.
pub const CSV_HEADER: [&str; 9] = [
    "name",
    "category",
    "description",
    "source",
    "source_id",
    "doi",
    "url",
    "authors",
    "keywords",
];

/// Current local time in [`SNAPSHOT_TIMESTAMP_FORMAT`].
#[must_use]
pub fn snapshot_timestamp() -> String {
    Local::now().format(SNAPSHOT_TIMESTAMP_FORMAT).to_string()
}

#[derive(Serialize)]
struct CsvRow<'a> {
    name: &'a str,
    category: &'static str,
    description: String,
    source: &'a str,
    source_id: &'a str,
    doi: &'a str,
    url: &'a str,
    authors: String,
    keywords: String,
}

impl<'a> From<&'a CanonicalTool> for CsvRow<'a> {
    fn from(tool: &'a CanonicalTool) -> Self {
        Self {
            name: tool.name(),
            category: tool.category().as_str(),
            description: tool.description().chars().take(CSV_DESCRIPTION_CHARS).collect(),
            source: tool.source(),
            source_id: tool.source_id(),
            doi: tool.doi().unwrap_or_default(),
            url: tool.url().unwrap_or_default(),
            authors: tool.authors().join(", "),
            keywords: tool.keywords().join(", "),
        }
    }
}

/// Writes `tools` as pretty-printed JSON into `dir` and returns the file path.
///
/// # Errors
///
/// Returns [`StorageError`] if serialization or the file write fails.
#[instrument(skip(tools), fields(dir = %dir.display(), count = tools.len()))]
pub fn write_json_snapshot(dir: &Path, tools: &[CanonicalTool]) -> Result<PathBuf, StorageError> {
    let path = dir.join(format!("tools_{}.json", snapshot_timestamp()));
    let content = serde_json::to_string_pretty(tools)?;
    fs::write(&path, content).map_err(|e| StorageError::io(&path, e))?;

    info!(path = %path.display(), count = tools.len(), "JSON snapshot written");
    Ok(path)
}

/// Writes `tools` as CSV into `dir` and returns the file path.
///
/// The header row is written even when `tools` is empty.
///
/// # Errors
///
/// Returns [`StorageError`] if the file cannot be created or written.
#[instrument(skip(tools), fields(dir = %dir.display(), count = tools.len()))]
pub fn write_csv_snapshot(dir: &Path, tools: &[CanonicalTool]) -> Result<PathBuf, StorageError> {
    let path = dir.join(format!("tools_{}.csv", snapshot_timestamp()));

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)?;
    writer.write_record(CSV_HEADER)?;
    for tool in tools {
        writer.serialize(CsvRow::from(tool))?;
    }
    writer.flush().map_err(|e| StorageError::io(&path, e))?;

    info!(path = %path.display(), count = tools.len(), "CSV snapshot written");
    Ok(path)
}

/// Reads a snapshot previously written by [`write_json_snapshot`].
///
/// # Errors
///
/// Returns [`StorageError`] if the file cannot be read or decoded.
pub fn load_json_snapshot(path: &Path) -> Result<Vec<CanonicalTool>, StorageError> {
    let content = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
    let tools: Vec<CanonicalTool> = serde_json::from_str(&content)?;
    info!(path = %path.display(), count = tools.len(), "JSON snapshot loaded");
    Ok(tools)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tool::Category;

    fn sample() -> Vec<CanonicalTool> {
        vec![
            CanonicalTool::new("Ultimate Automizer", Category::FunctionalCorrectness, "101")
                .with_description("Automata-based software verifier für C")
                .with_doi(Some("10.5281/zenodo.101".to_string()))
                .with_authors(vec!["Heizmann, Matthias".to_string(), "Podelski, Andreas".to_string()])
                .with_keywords(vec!["verification".to_string(), "SV-COMP".to_string()]),
            CanonicalTool::new("AProVE", Category::Termination, "202").with_description("x".repeat(450)),
        ]
    }

    #[test]
    fn test_snapshot_timestamp_shape() {
        let ts = snapshot_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(ts.as_bytes()[8], b'_');
    }

    #[test]
    fn test_json_snapshot_round_trips_and_keeps_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let tools = sample();

        let path = write_json_snapshot(dir.path(), &tools).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("tools_") && name.ends_with(".json"));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("für"));
        assert!(raw.contains("\n  "), "snapshot should be pretty-printed");

        assert_eq!(load_json_snapshot(&path).unwrap(), tools);
    }

    #[test]
    fn test_csv_snapshot_columns_and_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv_snapshot(dir.path(), &sample()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, CSV_HEADER);

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "functional_correctness");
        assert_eq!(&rows[0][7], "Heizmann, Matthias, Podelski, Andreas");
        assert_eq!(&rows[0][8], "verification, SV-COMP");
        assert_eq!(&rows[1][2], "x".repeat(200));
        assert_eq!(&rows[1][5], "");
    }

    #[test]
    fn test_csv_snapshot_empty_list_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv_snapshot(dir.path(), &[]).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.trim_end(), CSV_HEADER.join(","));
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            write_json_snapshot(&missing, &sample()),
            Err(StorageError::Io { .. })
        ));
        assert!(write_csv_snapshot(&missing, &sample()).is_err());
    }

    #[test]
    fn test_load_missing_snapshot_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_json_snapshot(&dir.path().join("absent.json")).is_err());
    }
}
