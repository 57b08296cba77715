//! Request classification.
//!
//! Decides whether a request gets the Markdown rendition instead of the
//! host's default response. Three independent signals are OR'd together:
//!
//! 1. the path ends in `.md`, ignoring trailing slashes (the suffix is
//!    stripped from the slug),
//! 2. the `User-Agent` contains a known LLM agent signature,
//! 3. the query string carries `format=md`.
//!
//! Only the suffix signal rewrites the slug. When the agent or override
//! signal fires alone, the path is used verbatim even if it contains dots.

use anyhow::Result;
use std::collections::HashMap;

use crate::config::Config;
use crate::traits::SignatureRegistry;

/// Path suffix that requests the Markdown rendition.
pub const MARKDOWN_SUFFIX: &str = ".md";

/// Query parameter (and exact value) that forces the Markdown rendition.
pub const FORMAT_PARAM: &str = "format";
pub const FORMAT_MARKDOWN: &str = "md";

/// Built-in lowercase User-Agent substrings of automated ingestion clients.
pub const DEFAULT_AGENT_SIGNATURES: &[&str] = &[
    "gptbot",
    "chatgpt-user",
    "oai-searchbot",
    "claudebot",
    "claude-web",
    "claude-user",
    "anthropic-ai",
    "perplexitybot",
    "perplexity-user",
    "google-extended",
    "googleother",
    "ccbot",
    "bytespider",
    "amazonbot",
    "applebot-extended",
    "meta-externalagent",
    "facebookbot",
    "cohere-ai",
    "mistralai-user",
    "youbot",
    "diffbot",
    "duckassistbot",
];

/// Returns the built-in signature list as owned strings.
pub fn default_signatures() -> Vec<String> {
    DEFAULT_AGENT_SIGNATURES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Which signal caused a request to be served as Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Suffix,
    Agent,
    FormatParam,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Suffix => "suffix",
            Trigger::Agent => "agent",
            Trigger::FormatParam => "format-param",
        }
    }
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub serve_markdown: bool,
    /// Identifier to resolve against the host. Suffix-stripped only when
    /// the suffix signal fired.
    pub slug: String,
    /// First signal that fired, in evaluation order.
    pub trigger: Option<Trigger>,
}

/// Classifies a request from its path, query parameters and `User-Agent`.
///
/// `signatures` is the freshly resolved agent list for this request; entries
/// are matched case-insensitively as plain substrings. Empty entries never
/// match.
pub fn classify(
    path: &str,
    query: &HashMap<String, String>,
    user_agent: Option<&str>,
    signatures: &[String],
) -> Classification {
    if let Some(stripped) = path.trim_end_matches('/').strip_suffix(MARKDOWN_SUFFIX) {
        return Classification {
            serve_markdown: true,
            slug: stripped.to_string(),
            trigger: Some(Trigger::Suffix),
        };
    }

    let trigger = if matches_agent(user_agent.unwrap_or(""), signatures) {
        Some(Trigger::Agent)
    } else if is_format_override(query) {
        Some(Trigger::FormatParam)
    } else {
        None
    };

    Classification {
        serve_markdown: trigger.is_some(),
        slug: path.to_string(),
        trigger,
    }
}

/// True when the lowercased `user_agent` contains any non-empty signature.
pub fn matches_agent(user_agent: &str, signatures: &[String]) -> bool {
    if user_agent.is_empty() {
        return false;
    }
    let ua = user_agent.to_lowercase();
    signatures
        .iter()
        .filter(|s| !s.is_empty())
        .any(|s| ua.contains(&s.to_lowercase()))
}

fn is_format_override(query: &HashMap<String, String>) -> bool {
    query.get(FORMAT_PARAM).map(String::as_str) == Some(FORMAT_MARKDOWN)
}

/// CLI entry point: prints the classification of a request.
pub fn run_classify(
    config: &Config,
    path: &str,
    user_agent: Option<&str>,
    query: Vec<(String, String)>,
) -> Result<()> {
    let signatures = SignatureRegistry::from_config(&config.agents).resolve();
    let query: HashMap<String, String> = query.into_iter().collect();
    let decision = classify(path, &query, user_agent, &signatures);

    println!("markdown: {}", decision.serve_markdown);
    println!(
        "trigger:  {}",
        decision.trigger.map(|t| t.as_str()).unwrap_or("none")
    );
    println!("slug:     {}", decision.slug);
    Ok(())
}

/// CLI entry point: prints the resolved agent signature list.
pub fn list_agents(config: &Config) -> Result<()> {
    let signatures = SignatureRegistry::from_config(&config.agents).resolve();
    println!("{} signatures", signatures.len());
    for signature in &signatures {
        println!("  {}", signature);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_suffix_strips_once() {
        let c = classify("/foo/bar.md", &q(&[]), None, &default_signatures());
        assert!(c.serve_markdown);
        assert_eq!(c.slug, "/foo/bar");
        assert_eq!(c.trigger, Some(Trigger::Suffix));
    }

    #[test]
    fn test_double_suffix_only_stripped_once() {
        let c = classify("/notes.md.md", &q(&[]), None, &[]);
        assert!(c.serve_markdown);
        assert_eq!(c.slug, "/notes.md");
    }

    #[test]
    fn test_suffix_before_trailing_slash() {
        let c = classify("/foo/bar.md/", &q(&[]), None, &[]);
        assert!(c.serve_markdown);
        assert_eq!(c.slug, "/foo/bar");
        assert_eq!(c.trigger, Some(Trigger::Suffix));
    }

    #[test]
    fn test_format_override() {
        let c = classify("/foo/bar", &q(&[("format", "md")]), None, &[]);
        assert!(c.serve_markdown);
        assert_eq!(c.slug, "/foo/bar");
        assert_eq!(c.trigger, Some(Trigger::FormatParam));
    }

    #[test]
    fn test_format_override_is_exact() {
        for value in ["MD", "markdown", "md ", "mdx", ""] {
            let c = classify("/foo", &q(&[("format", value)]), None, &[]);
            assert!(!c.serve_markdown, "format={:?} should not match", value);
        }
        let c = classify("/foo", &q(&[("Format", "md")]), None, &[]);
        assert!(!c.serve_markdown);
    }

    #[test]
    fn test_agent_signature_case_insensitive() {
        let sigs = default_signatures();
        let c = classify("/foo/bar", &q(&[]), Some("Mozilla/5.0 GPTBot/1.0"), &sigs);
        assert!(c.serve_markdown);
        assert_eq!(c.trigger, Some(Trigger::Agent));
        assert_eq!(c.slug, "/foo/bar");
    }

    #[test]
    fn test_uppercase_signature_from_hook_still_matches() {
        let sigs = vec!["MyCrawler".to_string()];
        assert!(matches_agent("mycrawler/2.1", &sigs));
    }

    #[test]
    fn test_browser_user_agent_falls_through() {
        let c = classify(
            "/foo/bar",
            &q(&[("page", "2")]),
            Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0"),
            &default_signatures(),
        );
        assert!(!c.serve_markdown);
        assert_eq!(c.trigger, None);
        assert_eq!(c.slug, "/foo/bar");
    }

    #[test]
    fn test_missing_user_agent_is_empty() {
        let c = classify("/foo", &q(&[]), None, &default_signatures());
        assert!(!c.serve_markdown);
    }

    #[test]
    fn test_empty_signature_never_matches() {
        let sigs = vec![String::new()];
        assert!(!matches_agent("Mozilla/5.0", &sigs));
    }

    #[test]
    fn test_dotted_path_not_stripped_without_suffix_signal() {
        let c = classify("/release-1.md-notes", &q(&[("format", "md")]), None, &[]);
        assert!(c.serve_markdown);
        assert_eq!(c.slug, "/release-1.md-notes");
    }

    #[test]
    fn test_suffix_wins_over_other_signals() {
        let c = classify(
            "/a.md",
            &q(&[("format", "md")]),
            Some("ClaudeBot"),
            &default_signatures(),
        );
        assert_eq!(c.trigger, Some(Trigger::Suffix));
        assert_eq!(c.slug, "/a");
    }
}
