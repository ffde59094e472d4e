//! Post page extraction.
//!
//! Fields are located with the CSS selectors of a [`MarkupProfile`]:
//!
//! | Field | Default selector | When absent |
//! |-------|------------------|-------------|
//! | title | `h1.post-title, h2` | [`ExtractionError::MissingTitle`] |
//! | subtitle | `h3.subtitle` | `None` |
//! | date | `div.pencraft…meta-EgzBVA` | [`DATE_NOT_FOUND`] |
//! | likes | `a.post-ufi-button .label` | `0` (also when not a number) |
//! | body | `div.available-content` | empty ([`ExtractionError::Conversion`] if conversion fails) |
//!
//! The body region is converted to Markdown with `htmd`, which keeps link
//! targets and never re-wraps lines.

use crate::config::MarkupProfile;
use crate::error::ExtractionError;
use crate::fetch::Document;
use crate::models::{ArticleIdentifier, DATE_NOT_FOUND, ExtractedArticle};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use tracing::{debug, instrument, warn};
use url::Url;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub fn compile_selector(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Compiled selectors for one markup profile.
#[derive(Debug, Clone)]
pub struct Extractor {
    title: Selector,
    subtitle: Selector,
    date: Selector,
    like_count: Selector,
    content: Selector,
}

impl Extractor {
    pub fn new(profile: &MarkupProfile) -> Result<Self, ExtractionError> {
        Ok(Self {
            title: compile_selector(&profile.title)?,
            subtitle: compile_selector(&profile.subtitle)?,
            date: compile_selector(&profile.date)?,
            like_count: compile_selector(&profile.like_count)?,
            content: compile_selector(&profile.content)?,
        })
    }

    /// Pull the article fields out of a fetched page.
    ///
    /// # Arguments
    ///
    /// * `document` - The fetched page and the location it came from
    ///
    /// # Returns
    ///
    /// The extracted article. Missing subtitle, date or like count fall back
    /// to their defaults.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::NoIdentifier`] when the location has no usable path
    /// segment, [`ExtractionError::MissingTitle`] when the title selector
    /// matches nothing, and [`ExtractionError::Conversion`] when the body
    /// cannot be converted to Markdown.
    #[instrument(level = "info", skip_all, fields(url = %document.location))]
    pub fn extract(&self, document: &Document) -> Result<ExtractedArticle, ExtractionError> {
        let url = document.location.to_string();
        let identifier = ArticleIdentifier::from_location(&document.location)
            .ok_or_else(|| ExtractionError::NoIdentifier { url: url.clone() })?;
        let html = Html::parse_document(&document.html);

        let title = first_text(&html, &self.title)
            .filter(|t| !t.is_empty())
            .ok_or(ExtractionError::MissingTitle { url })?;
        let subtitle = first_text(&html, &self.subtitle).filter(|s| !s.is_empty());
        let publication_date = first_text(&html, &self.date)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DATE_NOT_FOUND.to_string());
        let engagement_count = first_text(&html, &self.like_count)
            .as_deref()
            .map(parse_count)
            .unwrap_or(0);

        let body_markup = match html.select(&self.content).next() {
            Some(region) => region.html(),
            None => {
                warn!("Content region not found; body will be empty");
                String::new()
            }
        };
        let body = html_to_markdown(&body_markup, &document.location)?;

        debug!(%title, %publication_date, engagement_count, bytes = body.len(), "Extracted article");
        Ok(ExtractedArticle {
            identifier,
            source_location: document.location.clone(),
            title,
            subtitle,
            publication_date,
            engagement_count,
            body,
            body_markup,
        })
    }
}

/// Convert markup to Markdown, keeping link targets and original line breaks.
///
/// # Errors
///
/// [`ExtractionError::Conversion`] when the converter rejects the markup.
pub fn html_to_markdown(html: &str, url: &Url) -> Result<String, ExtractionError> {
    if html.trim().is_empty() {
        return Ok(String::new());
    }
    converted(htmd::convert(html), url)
}

fn converted<E: fmt::Display>(
    result: Result<String, E>,
    url: &Url,
) -> Result<String, ExtractionError> {
    result.map_err(|e| ExtractionError::Conversion {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Narrative artifact: synthesized header followed by the converted body.
///
/// ```text
/// # Title
///
/// ## Subtitle        (only when present)
///
/// **Mar 1, 2024**
///
/// **Likes:** 42
///
/// body…
/// ```
pub fn render_narrative(article: &ExtractedArticle) -> String {
    let mut out = format!("# {}\n\n", article.title);
    if let Some(subtitle) = &article.subtitle {
        out.push_str(&format!("## {subtitle}\n\n"));
    }
    out.push_str(&format!("**{}**\n\n", article.publication_date));
    out.push_str(&format!("**Likes:** {}\n\n", article.engagement_count));
    out.push_str(&article.body);
    out
}

fn first_text(html: &Html, selector: &Selector) -> Option<String> {
    html.select(selector).next().map(element_text)
}

fn element_text(element: ElementRef<'_>) -> String {
    let raw = element.text().collect::<String>();
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}

/// Digits only; anything else (`"Like"`, `"1.2K"`) counts as zero.
fn parse_count(raw: &str) -> u64 {
    let raw = raw.trim();
    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        raw.parse().unwrap_or(0)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_POST: &str = r#"<html><body>
<article>
  <h1 class="post-title">The   Long
     Essay</h1>
  <h3 class="subtitle">On patience</h3>
  <div class="pencraft pc-reset color-pub-secondary-text-hGQ02T line-height-20-t4M0El font-meta-MWBumP size-11-NuY2Zx weight-medium-fw81nC transform-uppercase-yKDgcq reset-IxiVJZ meta-EgzBVA">Mar 1, 2024</div>
  <a class="post-ufi-button"><span class="label">42</span></a>
  <div class="available-content">
    <p>First paragraph with a <a href="https://example.com/source">link</a>.</p>
    <p>Second paragraph that is deliberately long enough that a wrapping converter would break it across several lines of output text.</p>
  </div>
</article>
</body></html>"#;

    fn doc(html: &str) -> Document {
        Document {
            location: Url::parse("https://author.substack.com/p/the-long-essay").unwrap(),
            html: html.to_string(),
        }
    }

    fn extractor() -> Extractor {
        Extractor::new(&MarkupProfile::default()).unwrap()
    }

    #[test]
    fn test_extracts_all_fields() {
        let article = extractor().extract(&doc(FULL_POST)).unwrap();
        assert_eq!(article.identifier.as_str(), "the-long-essay");
        assert_eq!(article.title, "The Long Essay");
        assert_eq!(article.subtitle.as_deref(), Some("On patience"));
        assert_eq!(article.publication_date, "Mar 1, 2024");
        assert_eq!(article.engagement_count, 42);
        assert!(article.body_markup.contains("available-content"));
    }

    #[test]
    fn test_body_keeps_links_and_does_not_wrap() {
        let article = extractor().extract(&doc(FULL_POST)).unwrap();
        assert!(article.body.contains("[link](https://example.com/source)"));
        assert!(article.body.contains(
            "Second paragraph that is deliberately long enough that a wrapping converter would break it across several lines of output text."
        ));
    }

    #[test]
    fn test_missing_title_is_error() {
        let result = extractor().extract(&doc("<div class=\"available-content\"><p>x</p></div>"));
        assert!(matches!(result, Err(ExtractionError::MissingTitle { .. })));
    }

    #[test]
    fn test_h2_fallback_title() {
        let article = extractor().extract(&doc("<h2>Fallback Title</h2>")).unwrap();
        assert_eq!(article.title, "Fallback Title");
    }

    #[test]
    fn test_optional_fields_default() {
        let article = extractor()
            .extract(&doc("<h1 class=\"post-title\">Only a title</h1>"))
            .unwrap();
        assert_eq!(article.subtitle, None);
        assert_eq!(article.publication_date, DATE_NOT_FOUND);
        assert_eq!(article.engagement_count, 0);
        assert_eq!(article.body, "");
    }

    #[test]
    fn test_non_numeric_like_count_is_zero() {
        let html = r#"<h1 class="post-title">T</h1><a class="post-ufi-button"><span class="label">Like</span></a>"#;
        assert_eq!(extractor().extract(&doc(html)).unwrap().engagement_count, 0);
        assert_eq!(parse_count("1.2K"), 0);
        assert_eq!(parse_count(" 17 "), 17);
    }

    #[test]
    fn test_conversion_failure_is_extraction_error() {
        let url = Url::parse("https://author.substack.com/p/broken").unwrap();
        let result = converted(Err::<String, _>(std::io::Error::other("bad markup")), &url);
        assert_eq!(
            result,
            Err(ExtractionError::Conversion {
                url: url.to_string(),
                reason: "bad markup".to_string(),
            })
        );
        assert_eq!(
            converted(Ok::<_, std::io::Error>("text".to_string()), &url),
            Ok("text".to_string())
        );
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let profile = MarkupProfile {
            title: "h1[".to_string(),
            ..MarkupProfile::default()
        };
        assert!(matches!(
            Extractor::new(&profile),
            Err(ExtractionError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_narrative_header_order() {
        let article = extractor().extract(&doc(FULL_POST)).unwrap();
        let md = render_narrative(&article);
        let title = md.find("# The Long Essay").unwrap();
        let subtitle = md.find("## On patience").unwrap();
        let date = md.find("**Mar 1, 2024**").unwrap();
        let likes = md.find("**Likes:** 42").unwrap();
        let body = md.find("First paragraph").unwrap();
        assert!(title < subtitle && subtitle < date && date < likes && likes < body);
        assert!(md.starts_with("# The Long Essay\n\n"));
    }

    #[test]
    fn test_narrative_without_subtitle() {
        let article = extractor()
            .extract(&doc("<h1 class=\"post-title\">Plain</h1>"))
            .unwrap();
        assert_eq!(
            render_narrative(&article),
            "# Plain\n\n**Date not found**\n\n**Likes:** 0\n\n"
        );
    }
}
