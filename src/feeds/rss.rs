//! Recent posts from `feed.xml`.
//!
//! Only the newest items are listed (about twenty on Substack), so this is
//! the fallback when the sitemap is unavailable.

use crate::models::ArticleLocation;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// Parse an RSS 2.0 feed into locations. Items without a link are dropped;
/// an unparsable `pubDate` becomes `None`.
pub fn parse(xml: &str, base: &Url) -> Result<Vec<ArticleLocation>, quick_xml::DeError> {
    let rss: Rss = from_str(xml)?;
    let locations = rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| {
            let link = item.link?;
            let location = base.join(link.trim()).ok()?;
            let last_modified = item.pub_date.as_deref().and_then(parse_pub_date);
            Some(ArticleLocation::new(location, last_modified))
        })
        .collect::<Vec<_>>();
    debug!(count = locations.len(), "Parsed RSS feed");
    Ok(locations)
}

/// RFC 2822 date, e.g. `Fri, 01 Mar 2024 12:00:00 GMT`.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
