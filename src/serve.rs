use std::io;
use std::net::TcpListener;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode, Uri},
    response::Response,
    routing::get,
    Router,
};
use tokio::signal;
use tower_http::compression::CompressionLayer;

use crate::dispatch::{dispatch, Outcome};
use crate::error::Error;
use crate::fetch::{Fetch, HttpFetcher};
use crate::highlight::Highlight;
use crate::page::{self, PageHeader};
use crate::resolve::{Endpoints, ResolutionContext, ResolvedUrls, ReturnMode};
use crate::web_assets;

/// Maximum number of consecutive ports to try before giving up.
const MAX_PORT_ATTEMPTS: u16 = 100;

/// Everything `serve` needs, assembled from the command line.
pub struct ServeConfig {
    pub bind_addr: String,
    pub start_port: u16,
    pub endpoints: Endpoints,
    pub highlighter: Arc<dyn Highlight>,
}

/// Shared application state passed to all request handlers via `Arc<AppState>`.
///
/// Read-only after startup.
pub struct AppState<F> {
    /// Outbound base URLs.
    pub endpoints: Endpoints,
    /// Retrieves files from the CDN.
    pub fetcher: F,
    /// Engine for the code view.
    pub highlighter: Arc<dyn Highlight>,
}

/// Attempt to bind a TCP listener on `bind_addr` starting at `start_port`.
///
/// On `EADDRINUSE` the port is incremented by one and the attempt is retried up
/// to `MAX_PORT_ATTEMPTS` times.  Any other OS error causes an immediate failure
/// without further retries.
pub fn bind_with_retry(bind_addr: &str, start_port: u16) -> Result<(TcpListener, u16), Error> {
    let mut port = start_port;
    tracing::debug!(port, "bind: trying");
    for _ in 0..MAX_PORT_ATTEMPTS {
        let addr = format!("{}:{}", bind_addr, port);
        match TcpListener::bind(&addr) {
            Ok(listener) => {
                // Port 0 asks the OS to pick; report what it chose.
                let bound = listener.local_addr().map(|a| a.port()).unwrap_or(port);
                tracing::debug!(port = bound, "bind: success");
                return Ok((listener, bound));
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                let next = port.wrapping_add(1);
                tracing::debug!(port, next, "bind: EADDRINUSE");
                port = next;
            }
            Err(e) => {
                return Err(Error::Bind(format!(
                    "bind {}:{} failed: {}",
                    bind_addr, port, e
                )));
            }
        }
    }
    Err(Error::Bind(format!(
        "exhausted {} port candidates starting at {}; all ports in use",
        MAX_PORT_ATTEMPTS, start_port,
    )))
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// HTML response with mandatory security headers.
fn html_response(status: StatusCode, body: String) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from(body))
        .expect("html_response builder is infallible")
}

/// 404 Not Found for paths outside the viewer and its assets.
fn not_found_response() -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from("Not Found"))
        .expect("not_found_response builder is infallible")
}

/// `Location` value for a redirect target.
///
/// Targets are built from unvalidated query values, so they may hold spaces
/// or non-ASCII text.  A target that parses as a URL is sent in its
/// serialized, percent-encoded form.  Otherwise it is sent as-is only when
/// every byte is visible ASCII; anything else yields `None`.
fn location_header(location: &str) -> Option<HeaderValue> {
    if let Ok(parsed) = url::Url::parse(location) {
        return HeaderValue::from_str(parsed.as_str()).ok();
    }
    if location.bytes().all(|b| b.is_ascii_graphic()) {
        return HeaderValue::from_str(location).ok();
    }
    None
}

/// 302 Found pointing at `location`, with a fallback body.
///
/// When the target cannot be expressed as a header the body alone (a meta
/// refresh and a link) carries the redirect.
fn redirect_response(location: &str, step: &str) -> Response {
    let body = page::build_redirect_page(step, location);
    let Some(value) = location_header(location) else {
        tracing::warn!(%location, "redirect target is not a valid header value");
        return html_response(StatusCode::OK, body);
    };
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, value)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from(body))
        .expect("redirect_response builder is infallible")
}

/// Turn a dispatch outcome into the HTTP response for the client.
fn outcome_response(ctx: &ResolutionContext, urls: &ResolvedUrls, outcome: Outcome) -> Response {
    match outcome {
        Outcome::Redirect { location, step } => redirect_response(&location, step),
        Outcome::Highlighted {
            code_html,
            language,
        } => {
            let header = PageHeader::new(ctx, urls);
            html_response(
                StatusCode::OK,
                page::build_code_page(&header, &code_html, language),
            )
        }
        Outcome::Document(text) => html_response(StatusCode::OK, text),
        Outcome::NotFound { message } => {
            let header = PageHeader::new(ctx, urls);
            html_response(
                StatusCode::NOT_FOUND,
                page::build_not_found_page(&header, &message),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Axum request handlers
// ---------------------------------------------------------------------------

/// Viewer entry point: one query string, one outcome.
///
/// Resolves the query into a context and URLs, runs the dispatcher, and maps
/// its outcome to a response.  All responses include
/// `X-Content-Type-Options: nosniff`.
async fn view_handler<F: Fetch>(State(state): State<Arc<AppState<F>>>, uri: Uri) -> Response {
    let ctx = ResolutionContext::from_query(uri.query().unwrap_or(""));
    let urls = ResolvedUrls::resolve(&ctx, &state.endpoints);
    tracing::info!(
        mode = ctx.mode.map(ReturnMode::as_str).unwrap_or("document"),
        owner = %ctx.owner,
        repo = %ctx.repo,
        reference = %ctx.reference,
        path = %ctx.path,
        "request"
    );

    let outcome = dispatch(&ctx, &urls, &state.fetcher, &state.highlighter).await;
    outcome_response(&ctx, &urls, outcome)
}

async fn css_handler() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/css; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from(web_assets::CSS))
        .expect("css asset response builder is infallible")
}

async fn js_handler() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/javascript; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from(web_assets::JS))
        .expect("js asset response builder is infallible")
}

async fn fallback_handler(uri: Uri) -> Response {
    tracing::debug!(path = uri.path(), "no route");
    not_found_response()
}

/// Viewer, assets, and a plain 404 for everything else.
fn router<F: Fetch>(state: Arc<AppState<F>>) -> Router {
    Router::new()
        .route("/", get(view_handler::<F>))
        .route("/assets/viewer.css", get(css_handler))
        .route("/assets/viewer.js", get(js_handler))
        .fallback(fallback_handler)
        .layer(CompressionLayer::new())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the HTTP server.
///
/// Binds to `bind_addr` starting at `start_port`, retrying on `EADDRINUSE` up
/// to 100 times.  The server shuts down cleanly when SIGINT (Ctrl+C) is
/// received.
pub async fn run_serve(config: ServeConfig) -> Result<(), Error> {
    let ServeConfig {
        bind_addr,
        start_port,
        endpoints,
        highlighter,
    } = config;

    let (std_listener, bound_port) = bind_with_retry(&bind_addr, start_port)?;
    std_listener.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(std_listener)?;

    println!("cdnview serve");
    println!("cdn:   {}", endpoints.cdn);
    println!("url:   http://{}:{}/", bind_addr, bound_port);

    let state = Arc::new(AppState {
        endpoints,
        fetcher: HttpFetcher::new()?,
        highlighter,
    });
    tracing::info!(
        bind = %bind_addr,
        port = bound_port,
        highlighter = state.highlighter.name(),
        "listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to install SIGINT handler");
            }
            tracing::info!("shutdown complete");
        })
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
