//! Front matter for Markdown documents.
//!
//! The block is a narrow, hand-written YAML subset: quoted scalars and block
//! lists of quoted strings, nothing else.
//!
//! ```text
//! ---
//! title: "He said \"hi\""
//! categories:
//!   - "News"
//! ---
//!
//! ```
//!
//! Entries whose value is empty (empty string, absent, empty list) are left
//! out entirely.

use chrono::{DateTime, FixedOffset, Utc};

use crate::convert::strip_tags;
use crate::models::ContentRecord;

/// Block delimiter line.
pub const DELIMITER: &str = "---";

/// Keys in emission order.
pub const FIELD_ORDER: [&str; 9] = [
    "title",
    "slug",
    "date",
    "modified",
    "author",
    "excerpt",
    "categories",
    "tags",
    "canonical",
];

/// Value of a single front-matter entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(Option<String>),
    List(Vec<String>),
}

impl FieldValue {
    fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(None) => true,
            FieldValue::Text(Some(s)) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(Some(s.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(Some(s))
    }
}

impl From<Option<String>> for FieldValue {
    fn from(s: Option<String>) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// The nine fixed fields built from one record.
#[derive(Debug, Clone)]
pub struct FrontMatter {
    fields: Vec<(&'static str, FieldValue)>,
}

impl FrontMatter {
    pub fn from_record(record: &ContentRecord) -> Self {
        let values: [FieldValue; 9] = [
            record.title.as_str().into(),
            record.slug.as_str().into(),
            format_timestamp(&record.published_at).into(),
            format_timestamp(&record.modified_at).into(),
            record.author_name.clone().into(),
            strip_tags(&record.excerpt).into(),
            record.categories.clone().into(),
            record.tags.clone().into(),
            record.canonical_url.as_str().into(),
        ];

        Self {
            fields: FIELD_ORDER.into_iter().zip(values).collect(),
        }
    }

    pub fn fields(&self) -> &[(&'static str, FieldValue)] {
        &self.fields
    }

    pub fn encode(&self) -> String {
        encode(&self.fields)
    }
}

/// Serializes `fields` in order, delimiters and trailing blank line included.
pub fn encode(fields: &[(&str, FieldValue)]) -> String {
    let mut yaml = String::new();
    yaml.push_str(DELIMITER);
    yaml.push('\n');

    for (key, value) in fields {
        if value.is_empty() {
            continue;
        }
        match value {
            FieldValue::Text(Some(text)) => {
                yaml.push_str(&format!("{}: \"{}\"\n", key, escape(text)));
            }
            FieldValue::List(items) => {
                yaml.push_str(&format!("{}:\n", key));
                for item in items {
                    yaml.push_str(&format!("  - \"{}\"\n", escape(item)));
                }
            }
            FieldValue::Text(None) => {}
        }
    }

    yaml.push_str(DELIMITER);
    yaml.push_str("\n\n");
    yaml
}

/// Escapes a value for a double-quoted scalar.
///
/// `"` becomes `\"`; every `\r` and `\n` becomes a single space. Nothing
/// else is touched.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\r' | '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// ISO-8601 timestamp in UTC, e.g. `2024-05-01T10:00:00+00:00`.
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentKind;

    fn record() -> ContentRecord {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T12:30:00+02:00").unwrap();
        ContentRecord {
            kind: ContentKind::Article,
            title: "Hello World".to_string(),
            slug: "hello-world".to_string(),
            path: "hello-world".to_string(),
            raw_body: "<p>Body</p>".to_string(),
            excerpt: String::new(),
            published_at: ts,
            modified_at: ts,
            author_id: Some("1".to_string()),
            author_name: Some("Jane".to_string()),
            categories: vec!["News".to_string()],
            tags: vec![],
            canonical_url: "https://example.com/hello-world/".to_string(),
        }
    }

    #[test]
    fn test_record_block() {
        let block = FrontMatter::from_record(&record()).encode();
        assert_eq!(
            block,
            "---\n\
             title: \"Hello World\"\n\
             slug: \"hello-world\"\n\
             date: \"2024-05-01T10:30:00+00:00\"\n\
             modified: \"2024-05-01T10:30:00+00:00\"\n\
             author: \"Jane\"\n\
             categories:\n  - \"News\"\n\
             canonical: \"https://example.com/hello-world/\"\n\
             ---\n\n"
        );
    }

    #[test]
    fn test_empty_fields_omitted() {
        let mut rec = record();
        rec.author_name = None;
        rec.categories.clear();
        let block = FrontMatter::from_record(&rec).encode();
        for key in ["excerpt:", "tags:", "author:", "categories:"] {
            assert!(!block.contains(key), "{} should be omitted", key);
        }
        for key in ["title:", "slug:", "date:", "modified:", "canonical:"] {
            assert!(block.contains(key), "{} should be present", key);
        }
    }

    #[test]
    fn test_empty_author_name_omitted() {
        let mut rec = record();
        rec.author_name = Some(String::new());
        assert!(!FrontMatter::from_record(&rec).encode().contains("author:"));
    }

    #[test]
    fn test_excerpt_is_stripped_of_markup() {
        let mut rec = record();
        rec.excerpt = "<p>A <em>short</em> intro</p>".to_string();
        let block = FrontMatter::from_record(&rec).encode();
        assert!(block.contains("excerpt: \"A short intro\"\n"));
    }

    #[test]
    fn test_markup_only_excerpt_is_omitted() {
        let mut rec = record();
        rec.excerpt = "<p> </p>".to_string();
        assert!(!FrontMatter::from_record(&rec).encode().contains("excerpt:"));
    }

    #[test]
    fn test_escape_quotes() {
        let fields = [("title", FieldValue::from(r#"He said "hi""#))];
        assert_eq!(encode(&fields), "---\ntitle: \"He said \\\"hi\\\"\"\n---\n\n");
    }

    #[test]
    fn test_escape_newlines() {
        assert_eq!(escape("line one\nline two"), "line one line two");
        assert_eq!(escape("a\r\nb"), "a  b");
        assert_eq!(escape("tab\tand 'single' \\ stay"), "tab\tand 'single' \\ stay");
    }

    #[test]
    fn test_list_items_escaped() {
        let fields = [(
            "tags",
            FieldValue::from(vec!["say \"x\"".to_string(), "multi\nline".to_string()]),
        )];
        assert_eq!(
            encode(&fields),
            "---\ntags:\n  - \"say \\\"x\\\"\"\n  - \"multi line\"\n---\n\n"
        );
    }

    #[test]
    fn test_all_empty_yields_bare_delimiters() {
        let fields = [
            ("title", FieldValue::Text(None)),
            ("tags", FieldValue::List(vec![])),
            ("excerpt", FieldValue::from("")),
        ];
        assert_eq!(encode(&fields), "---\n---\n\n");
    }

    #[test]
    fn test_field_order_is_fixed() {
        let fm = FrontMatter::from_record(&record());
        let keys: Vec<&str> = fm.fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, FIELD_ORDER.to_vec());
    }
}
