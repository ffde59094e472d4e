//! Article discovery from an author's feeds.
//!
//! Two sources are tried in a fixed order:
//!
//! | Source | Module | Coverage | Timestamp |
//! |--------|--------|----------|-----------|
//! | `sitemap.xml` | [`sitemap`] | every post | `lastmod`, W3C datetime |
//! | `feed.xml` | [`rss`] | recent posts only | `pubDate`, RFC 2822 |
//!
//! The sitemap is fetched first. If it fails (error status, transport error,
//! malformed XML) or lists nothing, the RSS feed is fetched exactly once.
//! Neither attempt is retried.

pub mod rss;
pub mod sitemap;

use crate::error::{DiscoveryError, FeedError};
use crate::fetch::HttpGet;
use crate::models::{ArticleIdentifier, ArticleLocation};
use crate::utils::truncate_for_log;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Sitemap,
    Rss,
}

impl FeedKind {
    fn file_name(self) -> &'static str {
        match self {
            FeedKind::Sitemap => "sitemap.xml",
            FeedKind::Rss => "feed.xml",
        }
    }
}

/// Reads candidate article locations for one author.
#[derive(Debug)]
pub struct FeedReader<H> {
    http: H,
}

impl<H: HttpGet> FeedReader<H> {
    pub fn new(http: H) -> Self {
        Self { http }
    }

    /// Discover article locations under `base`, sitemap first.
    ///
    /// # Arguments
    ///
    /// * `base` - Publication root, ending in `/`
    ///
    /// # Returns
    ///
    /// Every location the feed lists, in feed order. Identifiers may repeat
    /// here; [`unique_by_identifier`] is applied after filtering so a
    /// non-article page cannot shadow a post with the same final segment.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError`] when the sitemap yields nothing and the RSS feed
    /// cannot be read either.
    #[instrument(level = "info", skip_all, fields(%base))]
    pub async fn discover(&self, base: &Url) -> Result<Vec<ArticleLocation>, DiscoveryError> {
        let primary = match self.read(base, FeedKind::Sitemap).await {
            Ok(locations) if !locations.is_empty() => {
                info!(count = locations.len(), "Discovered articles from sitemap");
                return Ok(locations);
            }
            Ok(_) => "sitemap listed no articles".to_string(),
            Err(e) => e.to_string(),
        };

        warn!(
            reason = %primary,
            "Falling back to feed.xml; only the most recent posts will be found"
        );
        match self.read(base, FeedKind::Rss).await {
            Ok(locations) => {
                info!(count = locations.len(), "Discovered articles from RSS feed");
                Ok(locations)
            }
            Err(e) => Err(DiscoveryError {
                primary,
                fallback: e.to_string(),
            }),
        }
    }

    async fn read(&self, base: &Url, kind: FeedKind) -> Result<Vec<ArticleLocation>, FeedError> {
        let url = base.join(kind.file_name()).map_err(|e| FeedError::Malformed {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        let response = self.http.get(&url).await?;
        if !response.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        let parsed = match kind {
            FeedKind::Sitemap => sitemap::parse(&response.body, base),
            FeedKind::Rss => rss::parse(&response.body, base),
        };
        parsed.map_err(|e| {
            debug!(%url, body = %truncate_for_log(&response.body, 300), "Unparsable feed body");
            FeedError::Malformed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// Keep the first location for each identifier and drop locations with none,
/// so identifiers are unique across the candidate list. Run this on filtered
/// candidates.
pub fn unique_by_identifier(locations: Vec<ArticleLocation>) -> Vec<ArticleLocation> {
    let mut seen: HashSet<ArticleIdentifier> = HashSet::new();
    let mut out = Vec::with_capacity(locations.len());
    for location in locations {
        match location.identifier() {
            Some(id) if seen.insert(id.clone()) => out.push(location),
            Some(id) => {
                warn!(identifier = %id, url = %location.location, "Duplicate identifier; keeping first location");
            }
            None => {
                debug!(url = %location.location, "Location has no identifier; dropped");
            }
        }
    }
    out
}
