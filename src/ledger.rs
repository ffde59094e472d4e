//! Per-author metadata ledger (`<data_dir>/<author>_metadata.json`).
//!
//! ```json
//! {
//!   "articles": { "<id>": { "url": "...", "title": "...", "date": "...", "scraped_at": "..." } },
//!   "last_update": "2024-03-01T12:00:00+00:00"
//! }
//! ```
//!
//! The ledger is a diagnostic record. Whether an article needs fetching is
//! decided from the artifact inventory, never from here.

use crate::error::StorageError;
use crate::models::{ArticleIdentifier, ExtractedArticle};
use crate::utils::write_atomic;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub url: String,
    pub title: String,
    pub date: String,
    pub scraped_at: String,
}

impl LedgerEntry {
    pub fn from_article(article: &ExtractedArticle) -> Self {
        Self {
            url: article.source_location.to_string(),
            title: article.title.clone(),
            date: article.publication_date.clone(),
            scraped_at: now_iso(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerData {
    #[serde(default)]
    pub articles: BTreeMap<ArticleIdentifier, LedgerEntry>,
    #[serde(default)]
    pub last_update: Option<String>,
}

/// The ledger file for one author, loaded into memory.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    data: LedgerData,
}

impl Ledger {
    /// Load the ledger at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - The author's `<author>_metadata.json`
    ///
    /// # Returns
    ///
    /// The loaded ledger. A missing file is an empty ledger with no
    /// `last_update`.
    ///
    /// # Errors
    ///
    /// [`StorageError::Io`] if the file exists but cannot be read, and
    /// [`StorageError::Json`] if it is not a valid ledger.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, StorageError> {
        let data = match fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::json(path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerData::default(),
            Err(e) => return Err(StorageError::io(path, e)),
        };
        info!(articles = data.articles.len(), "Loaded ledger");
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    /// Upsert; the newest record for an identifier wins.
    pub fn record(&mut self, id: ArticleIdentifier, entry: LedgerEntry) {
        self.data.articles.insert(id, entry);
    }

    #[cfg(test)]
    pub fn get(&self, id: &ArticleIdentifier) -> Option<&LedgerEntry> {
        self.data.articles.get(id)
    }

    pub fn last_update(&self) -> Option<&str> {
        self.data.last_update.as_deref()
    }

    /// Persist the whole ledger, stamping `last_update` with the current time.
    ///
    /// The file is replaced atomically, so a failed save leaves the previous
    /// ledger intact.
    ///
    /// # Errors
    ///
    /// [`StorageError::Json`] if serialization fails, [`StorageError::Io`] if
    /// the file cannot be written.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn save(&mut self) -> Result<(), StorageError> {
        self.data.last_update = Some(now_iso());
        let json = serde_json::to_string_pretty(&self.data)
            .map_err(|e| StorageError::json(&self.path, e))?;
        write_atomic(&self.path, json.as_bytes()).await?;
        info!(articles = self.data.articles.len(), "Saved ledger");
        Ok(())
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}
