//! Data models shared across the harvesting pipeline.
//!
//! - [`ArticleLocation`]: a candidate article discovered in an author's feed
//! - [`ArticleIdentifier`]: the stable key derived from a location's path
//! - [`ExtractedArticle`]: the structured record produced from one page
//! - [`EssaySummary`]: one entry of the per-author aggregate list
//! - [`RunReport`]: per-run counters rolled up by the orchestrator
//!
//! Everything is keyed by [`ArticleIdentifier`]: output filenames, the
//! existing-output inventory and the metadata ledger all use the same key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Sentinel stored when the publication date element is missing.
pub const DATE_NOT_FOUND: &str = "Date not found";

/// A candidate article location with its feed timestamp, if the feed had a
/// parsable one. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleLocation {
    pub location: Url,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ArticleLocation {
    pub fn new(location: Url, last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            location,
            last_modified,
        }
    }

    /// The identifier for this location, if its path has a usable segment.
    pub fn identifier(&self) -> Option<ArticleIdentifier> {
        ArticleIdentifier::from_location(&self.location)
    }
}

/// Stable key derived from the final non-empty path segment of a location.
///
/// `https://x.substack.com/p/on-writing` and `https://x.substack.com/p/on-writing/`
/// both yield `on-writing`. Query strings and fragments are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleIdentifier(String);

impl ArticleIdentifier {
    pub fn from_location(location: &Url) -> Option<Self> {
        let segment = location
            .path_segments()?
            .rev()
            .find(|s| !s.is_empty())?;
        if segment == "." || segment == ".." {
            return None;
        }
        Some(Self(segment.to_string()))
    }

    /// Identifier recovered from an artifact file name (`<id>.<ext>`).
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        if stem.is_empty() || stem.contains('/') {
            None
        } else {
            Some(Self(stem.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Artifact file name for this identifier, e.g. `on-writing.md`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.as_str(), extension.trim_start_matches('.'))
    }
}

impl fmt::Display for ArticleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured record extracted from a single fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedArticle {
    pub identifier: ArticleIdentifier,
    pub source_location: Url,
    pub title: String,
    pub subtitle: Option<String>,
    /// Best-effort display date; [`DATE_NOT_FOUND`] when absent.
    pub publication_date: String,
    pub engagement_count: u64,
    /// Content region converted to Markdown, links kept, no reflow.
    pub body: String,
    /// Content region markup as it appeared in the source page.
    pub body_markup: String,
}

/// One entry of the per-author aggregate list (`<data_dir>/<author>.json`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EssaySummary {
    pub title: String,
    pub subtitle: String,
    pub like_count: u64,
    pub date: String,
    pub file_link: String,
    pub html_link: String,
}

/// Counters for one author run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Locations surviving the date and keyword filters.
    pub candidates: usize,
    /// Candidates absent from local output (equals `candidates` outside incremental mode).
    pub new_work: usize,
    pub scraped: usize,
    pub skipped_gated: usize,
    pub failed: usize,
    /// Artifacts found on disk at write time; never re-fetched.
    pub already_present: usize,
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_identifier_is_final_path_segment() {
        let id = ArticleIdentifier::from_location(&url("https://author.substack.com/p/on-writing"));
        assert_eq!(id.unwrap().as_str(), "on-writing");
    }

    #[test]
    fn test_identifier_ignores_trailing_slash_query_and_fragment() {
        let id = ArticleIdentifier::from_location(&url(
            "https://author.substack.com/p/on-writing/?utm_source=feed#footnote-1",
        ));
        assert_eq!(id.unwrap().as_str(), "on-writing");
    }

    #[test]
    fn test_identifier_is_deterministic() {
        let loc = ArticleLocation::new(url("https://www.thefitzwilliam.com/p/the-long-essay"), None);
        assert_eq!(loc.identifier(), loc.identifier());
    }

    #[test]
    fn test_identifier_distinct_for_distinct_posts() {
        let a = ArticleIdentifier::from_location(&url("https://a.substack.com/p/first"));
        let b = ArticleIdentifier::from_location(&url("https://a.substack.com/p/second"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_identifier_absent_for_root() {
        assert!(ArticleIdentifier::from_location(&url("https://a.substack.com/")).is_none());
    }

    #[test]
    fn test_file_name() {
        let id = ArticleIdentifier::from_file_stem("on-writing").unwrap();
        assert_eq!(id.file_name("md"), "on-writing.md");
        assert_eq!(id.file_name(".html"), "on-writing.html");
    }

    #[test]
    fn test_essay_summary_round_trips_field_names() {
        let summary = EssaySummary {
            title: "Title".to_string(),
            subtitle: String::new(),
            like_count: 12,
            date: "Mar 1, 2024".to_string(),
            file_link: "md/a/x.md".to_string(),
            html_link: "html/a/x.html".to_string(),
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"like_count\":12"));
        assert!(json.contains("\"file_link\""));
    }
}
