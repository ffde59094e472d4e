//! Date and keyword filtering of candidate locations.
//!
//! Both predicates are pure and independent, so the order they are applied
//! in does not change the result.

use crate::models::ArticleLocation;
use chrono::{DateTime, Days, NaiveDate, Utc};
use tracing::{debug, instrument};

/// Inclusive lower bound on a location's feed timestamp.
///
/// A location with an unknown timestamp always passes.
pub fn passes_date_bound(location: &ArticleLocation, start: Option<NaiveDate>) -> bool {
    match (start, location.last_modified) {
        (Some(start), Some(modified)) => modified >= start_of_day(start),
        _ => true,
    }
}

/// True when the location's path contains none of `keywords`.
pub fn passes_keywords(location: &ArticleLocation, keywords: &[String]) -> bool {
    let path = location.location.path();
    !keywords.iter().any(|k| path.contains(k.as_str()))
}

/// Apply both filters, preserving order.
#[instrument(level = "info", skip_all, fields(?start, total = locations.len()))]
pub fn filter_locations(
    locations: Vec<ArticleLocation>,
    start: Option<NaiveDate>,
    keywords: &[String],
) -> Vec<ArticleLocation> {
    let kept: Vec<ArticleLocation> = locations
        .into_iter()
        .filter(|l| passes_date_bound(l, start) && passes_keywords(l, keywords))
        .collect();
    debug!(kept = kept.len(), "Filtered candidate locations");
    kept
}

/// Start bound `months` back from `today`, counting a month as 365/12 days.
pub fn months_before(today: NaiveDate, months: u32) -> NaiveDate {
    let days = u64::from(months) * 365 / 12;
    today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}
