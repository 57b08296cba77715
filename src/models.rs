//! Core data models used throughout Markdown Mirror.
//!
//! A [`ContentRecord`] is a read-only snapshot of an article or page owned by
//! the host content system. Nothing in this crate mutates or caches it.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// Kind of content record known to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Article,
    Page,
    Attachment,
}

impl ContentKind {
    /// Kinds that may be served as Markdown.
    pub const SERVABLE: [ContentKind; 2] = [ContentKind::Article, ContentKind::Page];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Page => "page",
            ContentKind::Attachment => "attachment",
        }
    }
}

/// Snapshot of a host content record.
#[derive(Debug, Clone)]
pub struct ContentRecord {
    pub kind: ContentKind,
    pub title: String,
    pub slug: String,
    /// Hierarchical path identifier, without leading or trailing `/`
    /// (e.g. `docs/getting-started`).
    pub path: String,
    /// Raw body as stored by the host (HTML or host markup).
    pub raw_body: String,
    /// May contain HTML; stripped to plain text before serialization.
    pub excerpt: String,
    pub published_at: DateTime<FixedOffset>,
    pub modified_at: DateTime<FixedOffset>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub canonical_url: String,
}
