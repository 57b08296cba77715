//! HTML → Markdown conversion.
//!
//! [`DomConverter`] is the default [`HtmlConverter`]: it parses the HTML
//! fragment with `scraper` and walks the DOM once, emitting Markdown for the
//! elements it knows. Elements without a Markdown equivalent are either
//! unwrapped to their content or kept as raw markup, depending on
//! [`ConvertOptions::strip_unknown_tags`].
//!
//! HTML comments are passed through verbatim. Removing them is the
//! responder's job.

use scraper::{ElementRef, Html, Node};
use thiserror::Error;

use crate::config::MarkdownConfig;
use crate::traits::HtmlConverter;

/// Conversion options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Drop markup of unknown tags and keep their content.
    pub strip_unknown_tags: bool,
    /// Emit `<br>` as a bare newline instead of a two-space line break.
    pub hard_line_breaks: bool,
    pub max_input_bytes: usize,
    pub max_depth: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::from_config(&MarkdownConfig::default())
    }
}

impl ConvertOptions {
    /// Options used for serving: both flags on, limits from config.
    pub fn from_config(config: &MarkdownConfig) -> Self {
        Self {
            strip_unknown_tags: true,
            hard_line_breaks: true,
            max_input_bytes: config.max_input_bytes,
            max_depth: config.max_depth,
        }
    }
}

/// Conversion failure. Fatal for the request that triggered it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("input of {size} bytes exceeds limit of {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },
    #[error("element nesting exceeds maximum depth of {0}")]
    TooDeep(usize),
}

/// DOM-walking HTML → Markdown converter.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomConverter;

impl HtmlConverter for DomConverter {
    fn convert(&self, html: &str, options: &ConvertOptions) -> Result<String, ConvertError> {
        if html.len() > options.max_input_bytes {
            return Err(ConvertError::InputTooLarge {
                size: html.len(),
                limit: options.max_input_bytes,
            });
        }

        let fragment = Html::parse_fragment(html);
        let walker = Walker { options };
        let raw = walker.children(fragment.root_element(), 0)?;
        Ok(normalize(&raw))
    }
}

struct Walker<'a> {
    options: &'a ConvertOptions,
}

impl Walker<'_> {
    fn children(&self, el: ElementRef<'_>, depth: usize) -> Result<String, ConvertError> {
        if depth > self.options.max_depth {
            return Err(ConvertError::TooDeep(self.options.max_depth));
        }

        let mut out = String::new();
        for child in el.children() {
            match child.value() {
                Node::Text(text) => {
                    let collapsed = collapse_whitespace(text);
                    // No leading space right after a line break or block.
                    let collapsed = if out.is_empty() || out.ends_with('\n') {
                        collapsed.trim_start()
                    } else {
                        collapsed.as_str()
                    };
                    out.push_str(&escape_markdown(collapsed));
                }
                Node::Comment(comment) => {
                    out.push_str("<!--");
                    out.push_str(comment);
                    out.push_str("-->");
                }
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        out.push_str(&self.element(child_el, depth + 1)?);
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }

    fn element(&self, el: ElementRef<'_>, depth: usize) -> Result<String, ConvertError> {
        let name = el.value().name();
        let md = match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let inner = self.children(el, depth)?;
                block(&format!("{} {}", "#".repeat(level), inner.trim()))
            }
            "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "aside"
            | "nav" | "figure" | "figcaption" => block(self.children(el, depth)?.trim()),
            "html" | "body" => self.children(el, depth)?,
            "br" => {
                if self.options.hard_line_breaks {
                    "\n".to_string()
                } else {
                    "  \n".to_string()
                }
            }
            "strong" | "b" => wrap_inline(&self.children(el, depth)?, "**"),
            "em" | "i" => wrap_inline(&self.children(el, depth)?, "*"),
            "code" => inline_code(&el.text().collect::<String>()),
            "pre" => code_block(el),
            "a" => self.link(el, depth)?,
            "img" => image(el),
            "ul" => self.list(el, depth, false)?,
            "ol" => self.list(el, depth, true)?,
            "blockquote" => self.blockquote(el, depth)?,
            "hr" => block("- - -"),
            "script" | "style" | "noscript" | "template" | "head" | "title" | "meta" | "link" => {
                String::new()
            }
            _ if self.options.strip_unknown_tags => self.children(el, depth)?,
            _ => el.html(),
        };
        Ok(md)
    }

    fn link(&self, el: ElementRef<'_>, depth: usize) -> Result<String, ConvertError> {
        let inner = self.children(el, depth)?;
        let text = inner.trim();
        let href = match el.value().attr("href") {
            Some(href) if !href.is_empty() => href,
            _ => return Ok(inner),
        };

        let md = match el.value().attr("title") {
            Some(title) if !title.is_empty() => {
                format!("[{}]({} \"{}\")", text, href, title.replace('"', "\\\""))
            }
            _ if text == href => format!("<{}>", href),
            _ => format!("[{}]({})", text, href),
        };
        Ok(md)
    }

    fn list(&self, el: ElementRef<'_>, depth: usize, ordered: bool) -> Result<String, ConvertError> {
        let mut number = el
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1);

        let mut items = Vec::new();
        for li in el.children().filter_map(ElementRef::wrap) {
            if li.value().name() != "li" {
                continue;
            }
            let marker = if ordered {
                let m = format!("{}. ", number);
                number = number.saturating_add(1);
                m
            } else {
                "- ".to_string()
            };
            let indent = " ".repeat(marker.len());

            let body = normalize(&self.children(li, depth + 1)?);
            let mut item = marker;
            for (i, line) in body.lines().filter(|l| !l.is_empty()).enumerate() {
                if i > 0 {
                    item.push('\n');
                    item.push_str(&indent);
                }
                item.push_str(line);
            }
            items.push(item);
        }
        Ok(block(&items.join("\n")))
    }

    fn blockquote(&self, el: ElementRef<'_>, depth: usize) -> Result<String, ConvertError> {
        let inner = normalize(&self.children(el, depth)?);
        let quoted = inner
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(block(&quoted))
    }
}

fn block(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }
    format!("\n\n{}\n\n", content)
}

fn wrap_inline(inner: &str, marker: &str) -> String {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return inner.to_string();
    }
    let lead = if inner.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if inner.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{}{}{}{}{}", lead, marker, trimmed, marker, trail)
}

fn inline_code(code: &str) -> String {
    if code.contains('`') {
        format!("`` {} ``", code)
    } else {
        format!("`{}`", code)
    }
}

fn code_block(el: ElementRef<'_>) -> String {
    let code: String = el.text().collect();
    let language = std::iter::once(el)
        .chain(el.children().filter_map(ElementRef::wrap))
        .filter_map(|e| e.value().attr("class"))
        .flat_map(str::split_whitespace)
        .find_map(|class| class.strip_prefix("language-"))
        .unwrap_or("");
    block(&format!(
        "```{}\n{}\n```",
        language,
        code.trim_end_matches('\n')
    ))
}

fn image(el: ElementRef<'_>) -> String {
    let src = match el.value().attr("src") {
        Some(src) if !src.is_empty() => src,
        _ => return String::new(),
    };
    let alt = el.value().attr("alt").unwrap_or("");
    match el.value().attr("title") {
        Some(title) if !title.is_empty() => {
            format!("![{}]({} \"{}\")", alt, src, title.replace('"', "\\\""))
        }
        _ => format!("![{}]({})", alt, src),
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Tidies generated Markdown.
///
/// Whitespace-only lines become empty, runs of empty lines collapse to one
/// and leading/trailing empty lines are dropped. Fenced code blocks are left
/// untouched.
pub fn normalize(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in raw.split('\n') {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            lines.push(line);
            continue;
        }
        if in_fence {
            lines.push(line);
            continue;
        }
        let line = if line.trim().is_empty() { "" } else { line };
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Reduces an HTML snippet to its text content.
///
/// Markup is removed, `script`/`style` content dropped and entities decoded.
pub fn strip_tags(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::new();
    for node in fragment.root_element().descendants() {
        if let Some(t) = node.value().as_text() {
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| matches!(e.name(), "script" | "style"))
            });
            if !hidden {
                text.push_str(t);
            }
        }
    }
    text.trim().to_string()
}
