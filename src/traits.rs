//! Extension traits for the host system and the agent signature hook.
//!
//! Markdown Mirror does not own content. Everything it reads comes through
//! the collaborator traits defined here:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │           SignatureRegistry              │
//! │  defaults ─▶ filter 1 ─▶ filter 2 ─▶ ... │
//! └──────────────┬───────────────────────────┘
//!                ▼ (resolved per request)
//!           classify() ─▶ ContentHost::lookup
//!                               │
//!                               ▼
//!         ContentHost::render_body_html ─▶ HtmlConverter
//! ```
//!
//! # Usage
//!
//! ```rust
//! use markdown_mirror::traits::SignatureRegistry;
//!
//! let mut signatures = SignatureRegistry::new();
//! signatures.register(|mut list: Vec<String>| {
//!     list.push("my-internal-crawler".to_string());
//!     list
//! });
//! assert!(signatures.resolve().contains(&"my-internal-crawler".to_string()));
//! ```

use anyhow::Result;
use async_trait::async_trait;

use crate::classify::default_signatures;
use crate::config::AgentsConfig;
use crate::convert::{ConvertError, ConvertOptions};
use crate::models::{ContentKind, ContentRecord};

// ═══════════════════════════════════════════════════════════════════════
// Content host
// ═══════════════════════════════════════════════════════════════════════

/// The host content system.
///
/// Implementations resolve path identifiers to records and render record
/// bodies through the host's content filter pipeline.
#[async_trait]
pub trait ContentHost: Send + Sync {
    /// Resolve a path-like identifier to a record of one of `kinds`.
    ///
    /// Returns `Ok(None)` when nothing matches. Leading and trailing `/`
    /// in `identifier` are not significant.
    async fn lookup(&self, identifier: &str, kinds: &[ContentKind])
        -> Result<Option<ContentRecord>>;

    /// Render the record's body to HTML with host filters applied.
    async fn render_body_html(&self, record: &ContentRecord) -> Result<String>;
}

// ═══════════════════════════════════════════════════════════════════════
// HTML → Markdown conversion
// ═══════════════════════════════════════════════════════════════════════

/// HTML to Markdown conversion capability.
pub trait HtmlConverter: Send + Sync {
    fn convert(&self, html: &str, options: &ConvertOptions) -> Result<String, ConvertError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Agent signature hook
// ═══════════════════════════════════════════════════════════════════════

/// A hook that receives the current signature list and returns a new one.
///
/// Filters may add, remove or replace entries. Closures of the shape
/// `Fn(Vec<String>) -> Vec<String>` implement this trait.
pub trait SignatureFilter: Send + Sync {
    fn filter(&self, signatures: Vec<String>) -> Vec<String>;
}

impl<F> SignatureFilter for F
where
    F: Fn(Vec<String>) -> Vec<String> + Send + Sync,
{
    fn filter(&self, signatures: Vec<String>) -> Vec<String> {
        self(signatures)
    }
}

/// Signature filter driven by the `[agents]` config table.
///
/// Applied in order: `replace` (when non-empty), then `remove`, then `extra`.
pub struct ConfigSignatureFilter {
    config: AgentsConfig,
}

impl ConfigSignatureFilter {
    pub fn new(config: AgentsConfig) -> Self {
        Self { config }
    }
}

impl SignatureFilter for ConfigSignatureFilter {
    fn filter(&self, signatures: Vec<String>) -> Vec<String> {
        let mut list = if self.config.replace.is_empty() {
            signatures
        } else {
            self.config.replace.clone()
        };

        let removed: Vec<String> = self
            .config
            .remove
            .iter()
            .map(|s| s.to_lowercase())
            .collect();
        list.retain(|s| !removed.contains(&s.to_lowercase()));

        for extra in &self.config.extra {
            let extra = extra.to_lowercase();
            if !list.iter().any(|s| s.to_lowercase() == extra) {
                list.push(extra);
            }
        }
        list
    }
}

/// Ordered chain of [`SignatureFilter`]s applied on top of the built-in list.
///
/// [`resolve`](SignatureRegistry::resolve) runs the whole chain every time it
/// is called; nothing is cached between requests.
pub struct SignatureRegistry {
    filters: Vec<Box<dyn SignatureFilter>>,
}

impl SignatureRegistry {
    /// Create a registry with no filters (resolves to the built-in list).
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Create a registry with the `[agents]` config filter registered.
    pub fn from_config(config: &AgentsConfig) -> Self {
        let mut registry = Self::new();
        registry.register(ConfigSignatureFilter::new(config.clone()));
        registry
    }

    /// Append a filter to the chain.
    pub fn register(&mut self, filter: impl SignatureFilter + 'static) {
        self.filters.push(Box::new(filter));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Build the signature list for one classification.
    pub fn resolve(&self) -> Vec<String> {
        self.filters
            .iter()
            .fold(default_signatures(), |list, f| f.filter(list))
    }
}

impl Default for SignatureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_registry_resolves_defaults() {
        let registry = SignatureRegistry::new();
        assert_eq!(registry.resolve(), default_signatures());
    }

    #[test]
    fn test_config_filter_add_and_remove() {
        let filter = ConfigSignatureFilter::new(AgentsConfig {
            replace: vec![],
            extra: strings(&["MyBot", "gptbot"]),
            remove: strings(&["CCBot"]),
        });
        let list = filter.filter(default_signatures());
        assert!(list.contains(&"mybot".to_string()));
        assert!(!list.contains(&"ccbot".to_string()));
        assert_eq!(list.iter().filter(|s| *s == "gptbot").count(), 1);
    }

    #[test]
    fn test_config_filter_replace() {
        let filter = ConfigSignatureFilter::new(AgentsConfig {
            replace: strings(&["onlybot"]),
            extra: vec![],
            remove: vec![],
        });
        assert_eq!(filter.filter(default_signatures()), strings(&["onlybot"]));
    }

    #[test]
    fn test_filters_chain_in_order() {
        let mut registry = SignatureRegistry::new();
        registry.register(|_: Vec<String>| strings(&["a"]));
        registry.register(|mut list: Vec<String>| {
            list.push("b".to_string());
            list
        });
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve(), strings(&["a", "b"]));
    }

    #[test]
    fn test_resolve_invokes_hooks_every_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = SignatureRegistry::new();
        registry.register(move |list: Vec<String>| {
            counter.fetch_add(1, Ordering::SeqCst);
            list
        });

        registry.resolve();
        registry.resolve();
        registry.resolve();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
