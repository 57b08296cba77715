//! HTTP server.
//!
//! The router stands in for the host site: its fallback handler is the
//! host's default HTML rendering. In front of every route sits the
//! Markdown gate middleware, which classifies each request and, when it
//! decides for Markdown, owns the response from then on:
//!
//! ```text
//! request ─▶ markdown_gate ──(not classified)──▶ default handlers
//!                 │
//!                 └─(classified)─▶ lookup ─▶ 404 (empty body)
//!                                    │
//!                                    └─▶ MarkdownResponder ─▶ 200 text/markdown
//! ```
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version); never classified |
//! | any    | `/*` | Host default: HTML rendering of the record at the path |
//!
//! # Error Contract
//!
//! Errors from the default handlers and internal failures use the JSON
//! envelope:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no content at /missing" } }
//! ```
//!
//! A classified request whose record does not exist gets a bare `404` with
//! an empty body instead.
//!
//! Request paths are percent-decoded before lookup. Every response the gate
//! lets through carries `Vary: User-Agent`, the same as the Markdown ones.

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode, Uri},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::classify::classify;
use crate::config::Config;
use crate::content::FileHost;
use crate::convert::ConvertOptions;
use crate::models::ContentKind;
use crate::respond::{MarkdownDocument, MarkdownResponder};
use crate::traits::{ContentHost, SignatureRegistry};

/// Path exempt from classification.
const HEALTH_PATH: &str = "/health";

/// Shared application state passed to the middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    host: Arc<dyn ContentHost>,
    responder: MarkdownResponder,
    /// Resolved on every request; never cached.
    signatures: Arc<SignatureRegistry>,
}

impl AppState {
    pub fn new(
        host: Arc<dyn ContentHost>,
        responder: MarkdownResponder,
        signatures: Arc<SignatureRegistry>,
    ) -> Self {
        Self {
            host,
            responder,
            signatures,
        }
    }
}

/// Starts the HTTP server with the file-backed host from `[site]`.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let host = FileHost::load_dir(&config.site.content_dir, config.site.base_url())?;
    info!(
        records = host.len(),
        dir = %config.site.content_dir.display(),
        "loaded content"
    );
    let signatures = SignatureRegistry::from_config(&config.agents);
    run_server_with_extensions(config, Arc::new(host), signatures).await
}

/// Starts the HTTP server with a custom host and signature hooks.
///
/// # Example
///
/// ```rust,no_run
/// use markdown_mirror::content::FileHost;
/// use markdown_mirror::server::run_server_with_extensions;
/// use markdown_mirror::traits::SignatureRegistry;
/// use std::sync::Arc;
///
/// # async fn example(config: &markdown_mirror::config::Config) -> anyhow::Result<()> {
/// let mut signatures = SignatureRegistry::from_config(&config.agents);
/// signatures.register(|mut list: Vec<String>| {
///     list.retain(|s| s != "ccbot");
///     list
/// });
/// run_server_with_extensions(config, Arc::new(FileHost::new()), signatures).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_server_with_extensions(
    config: &Config,
    host: Arc<dyn ContentHost>,
    signatures: SignatureRegistry,
) -> anyhow::Result<()> {
    let responder = MarkdownResponder::with_options(ConvertOptions::from_config(&config.markdown));
    let state = AppState::new(host, responder, Arc::new(signatures));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with the Markdown gate in front of all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(handle_health))
        .fallback(handle_page)
        .layer(middleware::from_fn_with_state(state.clone(), markdown_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Markdown gate ============

/// Classifies the request and short-circuits with Markdown when it matches.
async fn markdown_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if req.uri().path() == HEALTH_PATH {
        return next.run(req).await;
    }

    let query = Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .map(|Query(q)| q)
        .unwrap_or_default();
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    let signatures = state.signatures.resolve();
    let decision = classify(req.uri().path(), &query, user_agent, &signatures);

    let trigger = match decision.trigger {
        Some(trigger) if decision.serve_markdown => trigger,
        _ => {
            let mut response = next.run(req).await;
            response
                .headers_mut()
                .insert(header::VARY, HeaderValue::from_static("User-Agent"));
            return response;
        }
    };
    let slug = decode_path(&decision.slug);
    debug!(slug = %slug, trigger = trigger.as_str(), "serving markdown");

    match serve_markdown(&state, &slug).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn serve_markdown(state: &AppState, slug: &str) -> Result<Response, AppError> {
    let record = state
        .host
        .lookup(slug, &ContentKind::SERVABLE)
        .await
        .map_err(internal)?;

    let record = match record {
        Some(record) => record,
        None => {
            warn!(slug, "markdown requested for unknown content");
            return Ok(StatusCode::NOT_FOUND.into_response());
        }
    };

    let doc = state
        .responder
        .respond(state.host.as_ref(), &record)
        .await
        .map_err(|e| {
            error!(slug, "markdown rendering failed: {:#}", e);
            internal(e)
        })?;

    Ok(doc.into_response())
}

/// Percent-decodes a request path. Paths that do not decode to UTF-8 are
/// used as received.
fn decode_path(path: &str) -> Cow<'_, str> {
    urlencoding::decode(path).unwrap_or(Cow::Borrowed(path))
}

impl IntoResponse for MarkdownDocument {
    fn into_response(self) -> Response {
        let mut response = self.body.into_response();
        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        response
    }
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (`"not_found"`, `"internal"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: format!("{:#}", err),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Host default rendering ============

/// Default HTML rendering of the record at the request path.
///
/// Advertises the Markdown rendition with a `rel="alternate"` link.
async fn handle_page(State(state): State<AppState>, uri: Uri) -> Result<Html<String>, AppError> {
    let path = decode_path(uri.path());
    let record = state
        .host
        .lookup(&path, &ContentKind::SERVABLE)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no content at {}", path)))?;

    let body = state
        .host
        .render_body_html(&record)
        .await
        .map_err(internal)?;
    let title = escape_html(&record.title);

    Ok(Html(format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <link rel=\"alternate\" type=\"text/markdown\" href=\"/{path}.md\">\n\
         <link rel=\"canonical\" href=\"{canonical}\">\n</head>\n\
         <body>\n<article>\n<h1>{title}</h1>\n{body}\n</article>\n</body>\n</html>\n",
        title = title,
        path = escape_html(&record.path),
        canonical = escape_html(&record.canonical_url),
        body = body,
    )))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
