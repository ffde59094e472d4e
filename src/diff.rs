//! Incremental diff against already-written artifacts.
//!
//! The inventory of scraped articles is the set of `<id>.md` files in the
//! author's Markdown directory. It is the only source of truth for "already
//! scraped"; the metadata ledger is never consulted here.

use crate::error::StorageError;
use crate::models::{ArticleIdentifier, ArticleLocation};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Identifiers with a `<id>.<extension>` file in `dir`. A missing directory
/// is an empty inventory.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn existing_identifiers(
    dir: &Path,
    extension: &str,
) -> Result<HashSet<ArticleIdentifier>, StorageError> {
    let mut found = HashSet::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
        Err(e) => return Err(StorageError::io(dir, e)),
    };
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StorageError::io(dir, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        if let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(ArticleIdentifier::from_file_stem)
        {
            found.insert(id);
        }
    }
    info!(count = found.len(), "Listed existing artifacts");
    Ok(found)
}

/// Candidates split against the inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    pub total: usize,
    pub new_work: Vec<ArticleLocation>,
}

/// `candidates − existing`, by identifier, preserving candidate order.
pub fn new_work(candidates: Vec<ArticleLocation>, existing: &HashSet<ArticleIdentifier>) -> Diff {
    let total = candidates.len();
    let new_work: Vec<ArticleLocation> = candidates
        .into_iter()
        .filter(|l| l.identifier().is_some_and(|id| !existing.contains(&id)))
        .collect();
    info!(total, new = new_work.len(), "Computed new work");
    Diff { total, new_work }
}
