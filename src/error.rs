//! Error types for the harvesting pipeline.
//!
//! Each stage has its own error so the orchestrator can decide how far a
//! failure reaches:
//!
//! | Error | Scope | Effect on the run |
//! |-------|-------|-------------------|
//! | [`FeedError`] | one feed attempt | triggers the fallback feed |
//! | [`DiscoveryError`] | both feeds | run ends cleanly with zero new work |
//! | [`FetchError`] | one article | counted as failed, next article continues |
//! | [`ExtractionError`] | one article | counted as failed, next article continues |
//! | [`AuthenticationError`] | whole authenticated run | run aborts |
//! | [`StorageError`] | ledger, aggregate list | run aborts (an artifact write only fails its article) |
//!
//! Gated content is not an error at all; it surfaces as
//! [`crate::fetch::FetchOutcome::Skipped`].

use thiserror::Error;

/// A single feed document could not be retrieved or understood.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed feed document at {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Neither the full index nor the recent-items feed produced locations.
#[derive(Error, Debug)]
#[error("No article locations found (sitemap: {primary}; feed: {fallback})")]
pub struct DiscoveryError {
    pub primary: String,
    pub fallback: String,
}

/// Transport or navigation failure for one article.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Browser navigation failed: {0}")]
    Browser(#[from] BrowserError),
}

/// A fetched document did not have the expected structure.
#[derive(Error, Debug, PartialEq)]
pub enum ExtractionError {
    #[error("No title element found in {url}")]
    MissingTitle { url: String },

    #[error("No article identifier in {url}")]
    NoIdentifier { url: String },

    #[error("Invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Could not convert the body of {url} to Markdown: {reason}")]
    Conversion { url: String, reason: String },
}

/// WebDriver session or command failure.
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Could not start a WebDriver session: {0}")]
    Session(String),

    #[error("WebDriver command failed: {0}")]
    Command(String),
}

/// The authenticated run cannot continue.
#[derive(Error, Debug)]
pub enum AuthenticationError {
    #[error(
        "Login unsuccessful: {0}. Check the email and password or the account status; \
         if running headless, retry with --show-browser to look for a captcha"
    )]
    LoginFailed(String),

    #[error("Credentials required for premium scraping (set SUBSTACK_EMAIL and SUBSTACK_PASSWORD)")]
    MissingCredentials,

    #[error("Browser unavailable: {0}")]
    Browser(#[from] BrowserError),

    #[error("Login interrupted by cancellation")]
    Cancelled,
}

/// Persisting or loading local state failed.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn json(path: impl AsRef<std::path::Path>, source: serde_json::Error) -> Self {
        StorageError::Json {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Run-level failure for one author.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// The cancellation hook fired while waiting.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Cancelled")]
pub struct Cancelled;

impl From<Cancelled> for AuthenticationError {
    fn from(_: Cancelled) -> Self {
        AuthenticationError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_error_mentions_both_sources() {
        let err = DiscoveryError {
            primary: "status 404".to_string(),
            fallback: "status 500".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("status 404"));
        assert!(msg.contains("status 500"));
    }

    #[test]
    fn test_storage_error_includes_path() {
        let err = StorageError::io(
            "/tmp/ledger.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/ledger.json"));
    }

    #[test]
    fn test_cancelled_maps_to_authentication_error() {
        let err: AuthenticationError = Cancelled.into();
        assert!(matches!(err, AuthenticationError::Cancelled));
    }
}
