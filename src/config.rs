use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub markdown: MarkdownConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Prefix for canonical URLs, e.g. `https://example.com`.
    pub base_url: String,
    /// Directory scanned for `*.toml` content records.
    pub content_dir: PathBuf,
}

/// Adjustments to the built-in LLM agent signature list.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AgentsConfig {
    /// Replaces the built-in list when non-empty.
    #[serde(default)]
    pub replace: Vec<String>,
    #[serde(default)]
    pub extra: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarkdownConfig {
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: default_max_input_bytes(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_input_bytes() -> usize {
    5 * 1024 * 1024
}
fn default_max_depth() -> usize {
    256
}

impl SiteConfig {
    /// Base URL without a trailing `/`.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    let base = config.site.base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        anyhow::bail!(
            "site.base_url must start with http:// or https://, got '{}'",
            config.site.base_url
        );
    }

    if config.markdown.max_input_bytes == 0 {
        anyhow::bail!("markdown.max_input_bytes must be > 0");
    }
    if config.markdown.max_depth == 0 {
        anyhow::bail!("markdown.max_depth must be > 0");
    }

    Ok(config)
}
