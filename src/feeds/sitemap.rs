//! Full post index from `sitemap.xml`.
//!
//! ```xml
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url><loc>https://author.substack.com/p/slug</loc><lastmod>2024-03-01</lastmod></url>
//! </urlset>
//! ```

use crate::models::ArticleLocation;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct UrlSet {
    #[serde(rename = "url", default)]
    urls: Vec<SitemapUrl>,
}

#[derive(Debug, Deserialize)]
struct SitemapUrl {
    loc: Option<String>,
    lastmod: Option<String>,
}

/// Parse a sitemap into locations. Entries without a resolvable `loc` are
/// dropped; an unparsable `lastmod` becomes `None`.
pub fn parse(xml: &str, base: &Url) -> Result<Vec<ArticleLocation>, quick_xml::DeError> {
    let set: UrlSet = from_str(xml)?;
    let locations = set
        .urls
        .into_iter()
        .filter_map(|entry| {
            let loc = entry.loc?;
            let location = base.join(loc.trim()).ok()?;
            let last_modified = entry.lastmod.as_deref().and_then(parse_lastmod);
            Some(ArticleLocation::new(location, last_modified))
        })
        .collect::<Vec<_>>();
    debug!(count = locations.len(), "Parsed sitemap");
    Ok(locations)
}

/// W3C datetime as used by sitemaps: full RFC 3339, a naive timestamp, or a
/// bare date. Naive values are taken as UTC.
pub fn parse_lastmod(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
