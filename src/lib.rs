//! # Markdown Mirror
//!
//! Serves a Markdown rendition (front matter + Markdown body) of CMS
//! articles and pages to LLM agents, in place of the normal HTML page.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  no   ┌──────────────────┐
//! │ Classifier │──────▶│ host HTML (as-is)│
//! └─────┬──────┘       └──────────────────┘
//!       │ yes
//!       ▼
//! ┌────────────┐ miss  ┌──────────────────┐
//! │  Lookup    │──────▶│ 404, empty body  │
//! └─────┬──────┘       └──────────────────┘
//!       │ hit
//!       ▼
//! ┌────────────────────────────────────────┐
//! │ Responder: HTML → Markdown, strip      │
//! │ comments, front matter, title heading  │
//! └────────────────────────────────────────┘
//! ```
//!
//! A request is classified for Markdown when its path ends in `.md`, its
//! `User-Agent` contains a known LLM agent signature, or its query string
//! has `format=md`.
//!
//! ## Quick Start
//!
//! ```bash
//! mdmirror --config ./config/mdmirror.toml serve
//! curl http://127.0.0.1:8080/hello-world.md
//! curl -A "GPTBot/1.0" http://127.0.0.1:8080/hello-world
//! mdmirror render hello-world
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`classify`] | Request classification and default agent signatures |
//! | [`traits`] | Host, converter and signature-hook extension points |
//! | [`convert`] | Default HTML → Markdown converter |
//! | [`frontmatter`] | Front-matter fields and YAML-subset encoder |
//! | [`respond`] | Markdown document assembly and response headers |
//! | [`content`] | File-backed content host |
//! | [`models`] | Content record types |
//! | [`config`] | TOML configuration parsing |
//! | [`server`] | HTTP server and classification middleware |

pub mod classify;
pub mod config;
pub mod content;
pub mod convert;
pub mod frontmatter;
pub mod models;
pub mod respond;
pub mod server;
pub mod traits;
