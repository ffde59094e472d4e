//! Helpers for author naming, log formatting and file system writes.

use crate::error::StorageError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Author name from a publication URL: the first host label, or the second
/// when the first is `www`.
///
/// ```ignore
/// assert_eq!(author_name(&Url::parse("https://www.thefitzwilliam.com/")?), Some("thefitzwilliam".into()));
/// assert_eq!(author_name(&Url::parse("https://foo.substack.com")?), Some("foo".into()));
/// ```
pub fn author_name(base: &Url) -> Option<String> {
    let host = base.host_str()?;
    let mut labels = host.split('.');
    let first = labels.next()?;
    let name = if first == "www" { labels.next()? } else { first };
    (!name.is_empty()).then(|| name.to_string())
}

/// Base URL with a trailing slash so relative joins stay inside it.
pub fn normalize_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` bytes (on a character boundary) with an
/// ellipsis and byte count appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Arguments
///
/// * `path` - Directory to create and check
///
/// # Errors
///
/// [`StorageError::Io`] naming the directory when it cannot be created, or
/// the probe file when it cannot be written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| StorageError::io(path, e))?;
    let probe = path.join("..__probe_write__");
    fs::write(&probe, b"")
        .await
        .map_err(|e| StorageError::io(&probe, e))?;
    let _ = fs::remove_file(&probe).await;
    info!("Output directory is writable");
    Ok(())
}

/// Write `contents` to a hidden sibling and rename it over `path`, so a
/// reader never sees a partially written file.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let tmp = temp_sibling(path);
    fs::write(&tmp, contents)
        .await
        .map_err(|e| StorageError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StorageError::io(path, e));
    }
    Ok(())
}

/// Like [`write_atomic`] but refuses to replace an existing file.
/// Returns `false` when `path` already existed.
pub async fn write_new(path: &Path, contents: &[u8]) -> Result<bool, StorageError> {
    if fs::try_exists(path)
        .await
        .map_err(|e| StorageError::io(path, e))?
    {
        return Ok(false);
    }
    write_atomic(path, contents).await?;
    Ok(true)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}
