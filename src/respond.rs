//! Markdown responder.
//!
//! Turns a resolved [`ContentRecord`] into the full Markdown document:
//!
//! ```text
//! ---
//! <front matter>
//! ---
//!
//! # <title, verbatim>
//!
//! <body converted to Markdown, comments removed>
//! ```
//!
//! Either the whole document is produced or an error is returned. There is
//! no partial output.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::classify::MARKDOWN_SUFFIX;
use crate::config::Config;
use crate::content::FileHost;
use crate::convert::{normalize, ConvertError, ConvertOptions, DomConverter};
use crate::frontmatter::FrontMatter;
use crate::models::{ContentKind, ContentRecord};
use crate::traits::{ContentHost, HtmlConverter};

pub const CONTENT_TYPE_MARKDOWN: &str = "text/markdown; charset=utf-8";

/// Headers sent with every Markdown document.
pub const MARKDOWN_HEADERS: [(&str, &str); 4] = [
    ("content-type", CONTENT_TYPE_MARKDOWN),
    ("x-robots-tag", "noindex, nofollow"),
    ("vary", "User-Agent"),
    ("x-content-intent", "llm-ingestion"),
];

/// A rendered Markdown response: headers plus UTF-8 body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDocument {
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: String,
}

/// Renders records as Markdown documents.
#[derive(Clone)]
pub struct MarkdownResponder {
    converter: Arc<dyn HtmlConverter>,
    options: ConvertOptions,
}

impl MarkdownResponder {
    pub fn new(converter: Arc<dyn HtmlConverter>, options: ConvertOptions) -> Self {
        Self { converter, options }
    }

    /// Responder backed by [`DomConverter`].
    pub fn with_options(options: ConvertOptions) -> Self {
        Self::new(Arc::new(DomConverter), options)
    }

    /// Fetches the host-rendered body for `record` and renders the document.
    pub async fn respond(
        &self,
        host: &dyn ContentHost,
        record: &ContentRecord,
    ) -> Result<MarkdownDocument> {
        let html = host
            .render_body_html(record)
            .await
            .with_context(|| format!("failed to render body of '{}'", record.path))?;
        let doc = self
            .render(record, &html)
            .with_context(|| format!("failed to convert '{}' to markdown", record.path))?;
        Ok(doc)
    }

    /// Renders the document from an already host-rendered HTML body.
    pub fn render(
        &self,
        record: &ContentRecord,
        body_html: &str,
    ) -> Result<MarkdownDocument, ConvertError> {
        let converted = self.converter.convert(body_html, &self.options)?;
        let markdown = normalize(&strip_html_comments(&converted));

        let mut body = FrontMatter::from_record(record).encode();
        body.push_str("# ");
        body.push_str(&record.title);
        body.push_str("\n\n");
        body.push_str(&markdown);
        body.push('\n');

        Ok(MarkdownDocument {
            headers: MARKDOWN_HEADERS.to_vec(),
            body,
        })
    }
}

/// Removes every `<!-- ... -->` span, including ones spanning lines.
///
/// Matching is shortest-first, so text between two comments survives. An
/// opener without a closing `-->` is left as is.
pub fn strip_html_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<!--") {
        let after_open = &rest[start + 4..];
        match after_open.find("-->") {
            Some(end) => {
                out.push_str(&rest[..start]);
                rest = &after_open[end + 3..];
            }
            None => break,
        }
    }

    out.push_str(rest);
    out
}

/// CLI entry point: prints the Markdown document for a record path.
///
/// A trailing `.md` on `path` is accepted and ignored.
pub async fn run_render(config: &Config, path: &str) -> Result<()> {
    let host = FileHost::load_dir(&config.site.content_dir, config.site.base_url())?;
    let identifier = path.strip_suffix(MARKDOWN_SUFFIX).unwrap_or(path);
    let record = host
        .lookup(identifier, &ContentKind::SERVABLE)
        .await?
        .with_context(|| format!("content not found: {}", path))?;

    let responder = MarkdownResponder::with_options(ConvertOptions::from_config(&config.markdown));
    let doc = responder.respond(&host, &record).await?;
    print!("{}", doc.body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn record() -> ContentRecord {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T10:00:00+00:00").unwrap();
        ContentRecord {
            kind: ContentKind::Article,
            title: "Hello World".to_string(),
            slug: "hello-world".to_string(),
            path: "hello-world".to_string(),
            raw_body: String::new(),
            excerpt: String::new(),
            published_at: ts,
            modified_at: ts,
            author_id: Some("7".to_string()),
            author_name: Some("Jane".to_string()),
            categories: vec!["News".to_string()],
            tags: vec![],
            canonical_url: "https://example.com/hello-world/".to_string(),
        }
    }

    struct FailingConverter;

    impl HtmlConverter for FailingConverter {
        fn convert(&self, _html: &str, opts: &ConvertOptions) -> Result<String, ConvertError> {
            Err(ConvertError::TooDeep(opts.max_depth))
        }
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(
            strip_html_comments("<!-- note -->text<!-- multi\nline -->"),
            "text"
        );
        assert_eq!(strip_html_comments("a<!---->b<!-- x -- y -->c"), "abc");
        assert_eq!(strip_html_comments("keep <!-- open"), "keep <!-- open");
        assert_eq!(strip_html_comments("no comments"), "no comments");
    }

    #[test]
    fn test_strip_comments_idempotent() {
        let once = strip_html_comments("a<!-- 1 -->b\n<!--\n2\n-->c");
        assert_eq!(once, "ab\nc");
        assert_eq!(strip_html_comments(&once), once);
    }

    #[test]
    fn test_render_document() {
        let responder = MarkdownResponder::with_options(ConvertOptions::default());
        let doc = responder
            .render(&record(), "<p>First <em>post</em>.</p>")
            .unwrap();

        assert_eq!(
            doc.body,
            "---\n\
             title: \"Hello World\"\n\
             slug: \"hello-world\"\n\
             date: \"2024-05-01T10:00:00+00:00\"\n\
             modified: \"2024-05-01T10:00:00+00:00\"\n\
             author: \"Jane\"\n\
             categories:\n  - \"News\"\n\
             canonical: \"https://example.com/hello-world/\"\n\
             ---\n\n\
             # Hello World\n\n\
             First *post*.\n"
        );
        assert_eq!(doc.headers, MARKDOWN_HEADERS.to_vec());
    }

    #[test]
    fn test_title_heading_is_verbatim() {
        let mut rec = record();
        rec.title = "Fish & \"Chips\" <b>*now*</b>".to_string();
        let responder = MarkdownResponder::with_options(ConvertOptions::default());
        let doc = responder.render(&rec, "<p>x</p>").unwrap();
        assert!(doc
            .body
            .contains("\n# Fish & \"Chips\" <b>*now*</b>\n\nx\n"));
        assert!(doc
            .body
            .contains("title: \"Fish & \\\"Chips\\\" <b>*now*</b>\"\n"));
    }

    #[test]
    fn test_block_editor_comments_removed() {
        let html = "<!-- wp:paragraph -->\n<p>Hi</p>\n<!-- /wp:paragraph -->\n\
                    <!-- wp:list -->\n<ul><li>a</li></ul>\n<!-- /wp:list -->";
        let responder = MarkdownResponder::with_options(ConvertOptions::default());
        let doc = responder.render(&record(), html).unwrap();
        assert!(!doc.body.contains("<!--"));
        assert!(doc.body.ends_with("# Hello World\n\nHi\n\n- a\n"));
    }

    #[test]
    fn test_conversion_failure_yields_no_document() {
        let responder =
            MarkdownResponder::new(Arc::new(FailingConverter), ConvertOptions::default());
        assert!(responder.render(&record(), "<p>x</p>").is_err());
    }
}
