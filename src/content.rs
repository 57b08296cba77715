//! File-backed content host.
//!
//! [`FileHost`] is a small [`ContentHost`] that loads content records from
//! `*.toml` files under `[site].content_dir` at startup. It stands in for a
//! full content-management system when running `mdmirror` on its own.
//!
//! # Record format
//!
//! ```toml
//! kind = "article"                         # article | page | attachment
//! title = "Hello World"
//! slug = "hello-world"                     # defaults to the file stem
//! path = "2024/hello-world"                # defaults to the slug
//! author_id = "1"
//! author = "Jane"
//! published = "2024-05-01T10:00:00+00:00"  # quoted RFC 3339
//! modified = "2024-05-02T08:00:00+00:00"   # defaults to `published`
//! excerpt = ""
//! categories = ["News"]
//! tags = []
//! body = """<p>Hello!</p>"""
//! ```

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::models::{ContentKind, ContentRecord};
use crate::traits::ContentHost;

// ═══════════════════════════════════════════════════════════════════════
// Body filters
// ═══════════════════════════════════════════════════════════════════════

/// A host-side transformation applied to a record body before it is served.
pub trait ContentFilter: Send + Sync {
    fn apply(&self, html: String, record: &ContentRecord) -> String;
}

/// Wraps plain-text bodies in paragraphs.
///
/// Bodies that already contain block-level markup pass through unchanged.
/// Otherwise blank-line separated chunks become `<p>` elements and single
/// newlines inside a chunk become `<br />`.
pub struct AutoParagraph;

const BLOCK_TAGS: &[&str] = &[
    "<p", "<div", "<h1", "<h2", "<h3", "<h4", "<h5", "<h6", "<ul", "<ol", "<pre", "<blockquote",
    "<table", "<figure", "<section", "<article", "<hr",
];

impl ContentFilter for AutoParagraph {
    fn apply(&self, html: String, _record: &ContentRecord) -> String {
        let lower = html.to_lowercase();
        if BLOCK_TAGS.iter().any(|t| lower.contains(t)) {
            return html;
        }

        html.replace("\r\n", "\n")
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| format!("<p>{}</p>", p.replace('\n', "<br />\n")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FileHost
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct RecordFile {
    #[serde(default = "default_kind")]
    kind: ContentKind,
    title: String,
    slug: Option<String>,
    path: Option<String>,
    #[serde(default)]
    author_id: Option<String>,
    #[serde(default)]
    author: Option<String>,
    published: DateTime<FixedOffset>,
    modified: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    body: String,
}

fn default_kind() -> ContentKind {
    ContentKind::Article
}

/// In-memory content host keyed by record path.
pub struct FileHost {
    records: HashMap<String, ContentRecord>,
    filters: Vec<Box<dyn ContentFilter>>,
}

impl FileHost {
    /// Empty host with no body filters.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            filters: Vec::new(),
        }
    }

    /// Empty host with the default filter chain ([`AutoParagraph`]).
    pub fn with_default_filters() -> Self {
        let mut host = Self::new();
        host.add_filter(Box::new(AutoParagraph));
        host
    }

    /// Loads every `*.toml` record under `dir`.
    ///
    /// Canonical URLs are built as `{base_url}/{path}/`. Two records with the
    /// same path are an error.
    pub fn load_dir(dir: &Path, base_url: &str) -> Result<Self> {
        if !dir.is_dir() {
            bail!("content directory does not exist: {}", dir.display());
        }

        let mut host = Self::with_default_filters();
        let mut origins: HashMap<String, String> = HashMap::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("toml")
            {
                continue;
            }

            let record = read_record(path, base_url)?;
            let origin = path.display().to_string();
            if let Some(previous) = origins.insert(record.path.clone(), origin.clone()) {
                bail!(
                    "duplicate content path '{}' in {} and {}",
                    record.path,
                    previous,
                    origin
                );
            }
            debug!(path = %record.path, kind = record.kind.as_str(), "loaded content record");
            host.insert(record);
        }

        Ok(host)
    }

    pub fn insert(&mut self, record: ContentRecord) {
        self.records.insert(normalize_path(&record.path), record);
    }

    pub fn add_filter(&mut self, filter: Box<dyn ContentFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for FileHost {
    fn default() -> Self {
        Self::with_default_filters()
    }
}

#[async_trait]
impl ContentHost for FileHost {
    async fn lookup(
        &self,
        identifier: &str,
        kinds: &[ContentKind],
    ) -> Result<Option<ContentRecord>> {
        Ok(self
            .records
            .get(&normalize_path(identifier))
            .filter(|r| kinds.contains(&r.kind))
            .cloned())
    }

    async fn render_body_html(&self, record: &ContentRecord) -> Result<String> {
        Ok(self
            .filters
            .iter()
            .fold(record.raw_body.clone(), |html, f| f.apply(html, record)))
    }
}

/// Strips leading and trailing `/` from a path identifier.
pub fn normalize_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn read_record(path: &Path, base_url: &str) -> Result<ContentRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read content file: {}", path.display()))?;
    let file: RecordFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse content file: {}", path.display()))?;

    let slug = match file.slug {
        Some(slug) => slug,
        None => path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .with_context(|| format!("Cannot derive slug from {}", path.display()))?,
    };
    let record_path = normalize_path(file.path.as_deref().unwrap_or(&slug));
    if record_path.is_empty() {
        bail!("content file {} has an empty path", path.display());
    }

    Ok(ContentRecord {
        kind: file.kind,
        canonical_url: format!("{}/{}/", base_url.trim_end_matches('/'), record_path),
        title: file.title,
        slug,
        path: record_path,
        raw_body: file.body,
        excerpt: file.excerpt,
        published_at: file.published,
        modified_at: file.modified.unwrap_or(file.published),
        author_id: file.author_id,
        author_name: file.author,
        categories: file.categories,
        tags: file.tags,
    })
}
