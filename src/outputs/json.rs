//! Aggregate list output.
//!
//! Every author has one JSON array at `data_dir/<author>.json` listing an
//! [`EssaySummary`] per scraped article. A run merges its new summaries into
//! the existing list instead of replacing it.
//!
//! # Merge Rule
//!
//! The result is the existing entries in their current order, followed by
//! each new entry that is not structurally equal to an entry already in the
//! list. Re-running over the same articles therefore leaves the file
//! unchanged.

use crate::error::StorageError;
use crate::models::EssaySummary;
use crate::utils::write_atomic;
use itertools::Itertools;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Read the aggregate list at `path`.
///
/// A missing file is an empty list. A file that is not a JSON array of
/// summaries is an error: the caller should not silently discard it.
pub async fn read_summaries(path: &Path) -> Result<Vec<EssaySummary>, StorageError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    if raw.trim().is_empty() {
        warn!(path = %path.display(), "Aggregate file is empty; treating as no entries");
        return Ok(Vec::new());
    }
    serde_json::from_str(&raw).map_err(|e| StorageError::json(path, e))
}

/// Merge `new_entries` into the aggregate list at `path`.
///
/// # Arguments
///
/// * `path` - The author's aggregate file
/// * `new_entries` - Summaries produced by this run, in processing order
///
/// # Returns
///
/// The number of entries in the merged list.
#[instrument(level = "info", skip_all, fields(path = %path.display(), new = new_entries.len()))]
pub async fn merge_summaries(
    path: &Path,
    new_entries: Vec<EssaySummary>,
) -> Result<usize, StorageError> {
    let existing = read_summaries(path).await?;
    let before = existing.len();
    let merged: Vec<EssaySummary> = existing.into_iter().chain(new_entries).unique().collect();

    let json = serde_json::to_string_pretty(&merged).map_err(|e| StorageError::json(path, e))?;
    write_atomic(path, json.as_bytes()).await?;

    info!(before, after = merged.len(), "Wrote aggregate list");
    Ok(merged.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, likes: u64) -> EssaySummary {
        EssaySummary {
            title: title.to_string(),
            subtitle: String::new(),
            like_count: likes,
            date: "Mar 1, 2024".to_string(),
            file_link: format!("md/author/{title}.md"),
            html_link: format!("html/author/{title}.html"),
        }
    }

    #[tokio::test]
    async fn test_merge_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("author.json");
        let count = merge_summaries(&path, vec![entry("a", 1), entry("b", 2)])
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(read_summaries(&path).await.unwrap(), vec![entry("a", 1), entry("b", 2)]);
    }

    #[tokio::test]
    async fn test_merge_preserves_existing_and_skips_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("author.json");
        merge_summaries(&path, vec![entry("a", 1)]).await.unwrap();

        let count = merge_summaries(&path, vec![entry("a", 1), entry("c", 3)])
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(read_summaries(&path).await.unwrap(), vec![entry("a", 1), entry("c", 3)]);
    }

    #[tokio::test]
    async fn test_changed_entry_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("author.json");
        merge_summaries(&path, vec![entry("a", 1)]).await.unwrap();
        let count = merge_summaries(&path, vec![entry("a", 5)]).await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_malformed_aggregate_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("author.json");
        std::fs::write(&path, "{not json").unwrap();
        let result = merge_summaries(&path, vec![entry("a", 1)]).await;
        assert!(matches!(result, Err(StorageError::Json { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }
}
