//! Report of authors already scraped, for the `list` subcommand.

use crate::diff::existing_identifiers;
use crate::error::StorageError;
use crate::ledger::Ledger;
use crate::outputs::ledger_path;
use crate::outputs::artifacts::MARKDOWN_EXT;
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorListing {
    pub author: String,
    pub articles: usize,
    /// Date part of the ledger's `last_update`, if there is one.
    pub last_update: Option<String>,
}

impl fmt::Display for AuthorListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} posts (last update: {})",
            self.author,
            self.articles,
            self.last_update.as_deref().unwrap_or("Unknown")
        )
    }
}

/// One entry per author directory under `md_dir`, sorted by author.
pub async fn list_authors(md_dir: &Path, data_dir: &Path) -> Result<Vec<AuthorListing>, StorageError> {
    let mut out = Vec::new();
    let mut entries = match fs::read_dir(md_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(StorageError::io(md_dir, e)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StorageError::io(md_dir, e))?
    {
        let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
        let Some(author) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !is_dir {
            continue;
        }

        let articles = existing_identifiers(&md_dir.join(&author), MARKDOWN_EXT)
            .await?
            .len();
        let last_update = match Ledger::load(&ledger_path(data_dir, &author)).await {
            Ok(ledger) => ledger
                .last_update()
                .map(|ts| ts.split('T').next().unwrap_or(ts).to_string()),
            Err(e) => {
                warn!(%author, error = %e, "Unreadable ledger");
                None
            }
        };
        out.push(AuthorListing {
            author,
            articles,
            last_update,
        });
    }

    out.sort_by(|a, b| a.author.cmp(&b.author));
    Ok(out)
}
