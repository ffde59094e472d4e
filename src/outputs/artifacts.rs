//! Per-article artifact files.
//!
//! Each article produces a standalone HTML document and a Markdown narrative.
//! The HTML file is committed first and the Markdown file last: the
//! Markdown file is the inventory key, so its presence implies both
//! artifacts are complete. Existing files are never replaced.

use super::AuthorPaths;
use crate::error::StorageError;
use crate::extract::render_narrative;
use crate::models::{ArticleIdentifier, EssaySummary, ExtractedArticle};
use crate::utils::write_new;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

pub const MARKDOWN_EXT: &str = "md";
pub const HTML_EXT: &str = "html";
const STYLESHEET: &str = "assets/css/essay-styles.css";

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Written { markdown: PathBuf, html: PathBuf },
    AlreadyPresent(PathBuf),
}

pub fn markdown_path(paths: &AuthorPaths, id: &ArticleIdentifier) -> PathBuf {
    paths.markdown_dir.join(id.file_name(MARKDOWN_EXT))
}

pub fn html_path(paths: &AuthorPaths, id: &ArticleIdentifier) -> PathBuf {
    paths.html_dir.join(id.file_name(HTML_EXT))
}

/// Whether the article's Markdown artifact is already on disk.
pub async fn exists(paths: &AuthorPaths, id: &ArticleIdentifier) -> bool {
    fs::try_exists(markdown_path(paths, id)).await.unwrap_or(false)
}

/// Write both artifacts for `article`, HTML first.
#[instrument(level = "info", skip_all, fields(id = %article.identifier))]
pub async fn write(paths: &AuthorPaths, article: &ExtractedArticle) -> Result<WriteOutcome, StorageError> {
    let markdown = markdown_path(paths, &article.identifier);
    let html = html_path(paths, &article.identifier);

    if exists(paths, &article.identifier).await {
        info!(path = %markdown.display(), "File already exists");
        return Ok(WriteOutcome::AlreadyPresent(markdown));
    }

    let document = render_document(article, &stylesheet_href(&paths.html_dir));
    if !write_new(&html, document.as_bytes()).await? {
        warn!(path = %html.display(), "HTML artifact already present; keeping it");
    }
    write_new(&markdown, render_narrative(article).as_bytes()).await?;

    info!(markdown = %markdown.display(), html = %html.display(), "Wrote article artifacts");
    Ok(WriteOutcome::Written { markdown, html })
}

/// Aggregate list entry pointing at the written artifacts.
pub fn summary(article: &ExtractedArticle, markdown: &Path, html: &Path) -> EssaySummary {
    EssaySummary {
        title: article.title.clone(),
        subtitle: article.subtitle.clone().unwrap_or_default(),
        like_count: article.engagement_count,
        date: article.publication_date.clone(),
        file_link: markdown.display().to_string(),
        html_link: html.display().to_string(),
    }
}

/// Standalone HTML page: header block then the source content region.
pub fn render_document(article: &ExtractedArticle, stylesheet: &str) -> String {
    let title = encode_text(&article.title);
    let mut header = format!("<h1>{title}</h1>\n");
    if let Some(subtitle) = &article.subtitle {
        header.push_str(&format!("<h2>{}</h2>\n", encode_text(subtitle)));
    }
    header.push_str(&format!(
        "<p><strong>{}</strong></p>\n<p><strong>Likes:</strong> {}</p>\n",
        encode_text(&article.publication_date),
        article.engagement_count
    ));

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="{href}">
</head>
<body>
    <main class="markdown-content">
{header}{body}
    </main>
</body>
</html>
"#,
        href = encode_double_quoted_attribute(stylesheet),
        body = article.body_markup,
    )
}

/// Path from `html_dir` back to the shared stylesheet under the working
/// directory.
fn stylesheet_href(html_dir: &Path) -> String {
    let relative = if html_dir.is_absolute() {
        std::env::current_dir()
            .ok()
            .and_then(|cwd| html_dir.strip_prefix(cwd).ok().map(Path::to_path_buf))
    } else {
        Some(html_dir.to_path_buf())
    };
    match relative {
        Some(dir) => {
            let depth = dir
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count();
            format!("{}{STYLESHEET}", "../".repeat(depth))
        }
        None => format!("/{STYLESHEET}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn article(id: &str) -> ExtractedArticle {
        ExtractedArticle {
            identifier: ArticleIdentifier::from_file_stem(id).unwrap(),
            source_location: Url::parse(&format!("https://author.substack.com/p/{id}")).unwrap(),
            title: "Tom & Jerry <3".to_string(),
            subtitle: Some("A study".to_string()),
            publication_date: "Apr 1, 2024".to_string(),
            engagement_count: 7,
            body: "Body text.".to_string(),
            body_markup: "<div class=\"available-content\"><p>Body text.</p></div>".to_string(),
        }
    }

    fn paths(root: &Path) -> AuthorPaths {
        let paths = AuthorPaths::new("author", &root.join("md"), &root.join("html"), &root.join("data"));
        std::fs::create_dir_all(&paths.markdown_dir).unwrap();
        std::fs::create_dir_all(&paths.html_dir).unwrap();
        paths
    }

    #[tokio::test]
    async fn test_write_creates_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let outcome = write(&paths, &article("essay")).await.unwrap();

        let WriteOutcome::Written { markdown, html } = outcome else {
            panic!("expected artifacts to be written");
        };
        let md = std::fs::read_to_string(markdown).unwrap();
        assert!(md.starts_with("# Tom & Jerry <3\n\n## A study\n\n**Apr 1, 2024**\n\n**Likes:** 7\n\n"));
        let page = std::fs::read_to_string(html).unwrap();
        assert!(page.contains("<title>Tom &amp; Jerry &lt;3</title>"));
        assert!(page.contains("<p>Body text.</p>"));
    }

    #[tokio::test]
    async fn test_existing_markdown_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let existing = markdown_path(&paths, &ArticleIdentifier::from_file_stem("essay").unwrap());
        std::fs::write(&existing, "keep me").unwrap();

        let outcome = write(&paths, &article("essay")).await.unwrap();
        assert_eq!(outcome, WriteOutcome::AlreadyPresent(existing.clone()));
        assert_eq!(std::fs::read_to_string(existing).unwrap(), "keep me");
    }

    #[test]
    fn test_stylesheet_href_relative_depth() {
        assert_eq!(
            stylesheet_href(Path::new("substack_html_pages/author")),
            "../../assets/css/essay-styles.css"
        );
        assert_eq!(
            stylesheet_href(Path::new("./out/html/author")),
            "../../../assets/css/essay-styles.css"
        );
    }

    #[test]
    fn test_summary_fields() {
        let s = summary(&article("essay"), Path::new("md/author/essay.md"), Path::new("html/author/essay.html"));
        assert_eq!(s.subtitle, "A study");
        assert_eq!(s.like_count, 7);
        assert_eq!(s.file_link, "md/author/essay.md");
    }
}
