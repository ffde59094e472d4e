//! Output generation: per-article artifacts and the per-author aggregate list.
//!
//! # Submodules
//!
//! - [`artifacts`]: Writes `<id>.md` and `<id>.html` for each scraped article
//! - [`json`]: Merges article summaries into the author's aggregate list
//!
//! # Output Structure
//!
//! ```text
//! md_dir/
//! └── <author>/
//!     └── <id>.md            # narrative text (inventory key)
//! html_dir/
//! └── <author>/
//!     └── <id>.html          # standalone document
//! data_dir/
//! ├── <author>.json          # aggregate list
//! └── <author>_metadata.json # ledger
//! ```

pub mod artifacts;
pub mod json;

use std::path::{Path, PathBuf};

/// Resolved output locations for one author. Nothing here is shared between
/// authors.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorPaths {
    pub author: String,
    pub markdown_dir: PathBuf,
    pub html_dir: PathBuf,
    pub aggregate_file: PathBuf,
    pub ledger_file: PathBuf,
}

impl AuthorPaths {
    pub fn new(author: &str, md_root: &Path, html_root: &Path, data_root: &Path) -> Self {
        Self {
            author: author.to_string(),
            markdown_dir: md_root.join(author),
            html_dir: html_root.join(author),
            aggregate_file: data_root.join(format!("{author}.json")),
            ledger_file: ledger_path(data_root, author),
        }
    }
}

/// `<data_root>/<author>_metadata.json`
pub fn ledger_path(data_root: &Path, author: &str) -> PathBuf {
    data_root.join(format!("{author}_metadata.json"))
}
