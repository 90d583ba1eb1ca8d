//! Return-mode dispatch.
//!
//! Every request ends in exactly one [`Outcome`].  Redirect modes never
//! fetch; the highlighted view and the default document render fetch the
//! file once and stop on the first failure.

use std::sync::Arc;

use crate::fetch::Fetch;
use crate::highlight::{language_tag, Highlight};
use crate::page::html_escape;
use crate::resolve::{ResolutionContext, ResolvedUrls, ReturnMode};
use crate::rewrite::{looks_like_html, rewrite_assets};

/// Terminal result of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Send the client elsewhere.  `step` is the status text for the body.
    Redirect {
        location: String,
        step: &'static str,
    },
    /// Highlighted markup for the code view.
    Highlighted {
        code_html: String,
        language: Option<&'static str>,
    },
    /// Fetched text, rewritten when it is HTML and rewriting is enabled.
    Document(String),
    /// The fetch failed; `message` is shown in place of the content.
    NotFound { message: String },
}

/// Run the branch selected by `ctx.mode`.
pub async fn dispatch<F: Fetch>(
    ctx: &ResolutionContext,
    urls: &ResolvedUrls,
    fetcher: &F,
    highlighter: &Arc<dyn Highlight>,
) -> Outcome {
    match ctx.mode {
        Some(ReturnMode::Raw) => redirect(&urls.file, "Redirecting to raw file…"),
        Some(ReturnMode::Viewer) => redirect(&urls.repo_page, "Redirecting to GitHub…"),
        Some(ReturnMode::Editor) => redirect(&urls.editor, "Opening in github.dev…"),
        Some(ReturnMode::Sandbox) => redirect(&urls.sandbox, "Opening in StackBlitz…"),
        Some(ReturnMode::Highlighted) => highlighted_view(ctx, urls, fetcher, highlighter).await,
        None => document(ctx, urls, fetcher).await,
    }
}

fn redirect(location: &str, step: &'static str) -> Outcome {
    tracing::debug!(%location, "{step}");
    Outcome::Redirect {
        location: location.to_owned(),
        step,
    }
}

async fn highlighted_view<F: Fetch>(
    ctx: &ResolutionContext,
    urls: &ResolvedUrls,
    fetcher: &F,
    highlighter: &Arc<dyn Highlight>,
) -> Outcome {
    tracing::debug!(url = %urls.file, "Fetching file content…");
    let code = match fetcher.fetch(&urls.file).await {
        Ok(code) => code,
        Err(err) => {
            tracing::warn!(path = %ctx.path, error = %err, "fetch failed");
            return Outcome::NotFound {
                message: "Not Found".to_owned(),
            };
        }
    };

    let language = language_tag(&ctx.extension());
    tracing::debug!(
        language = language.unwrap_or(""),
        engine = highlighter.name(),
        "Rendering code…"
    );
    let engine = Arc::clone(highlighter);
    let source = code.clone();
    let code_html =
        match tokio::task::spawn_blocking(move || engine.highlight(&source, language)).await {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(path = %ctx.path, error = %err, "highlighter failed; showing plain text");
                html_escape(&code)
            }
        };
    Outcome::Highlighted {
        code_html,
        language,
    }
}

async fn document<F: Fetch>(
    ctx: &ResolutionContext,
    urls: &ResolvedUrls,
    fetcher: &F,
) -> Outcome {
    tracing::debug!(url = %urls.file, "Fetching file (raw mode)…");
    let text = match fetcher.fetch(&urls.file).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(path = %ctx.path, error = %err, "fetch failed");
            return Outcome::NotFound {
                message: format!("Failed to fetch {}", ctx.path),
            };
        }
    };

    let is_html = looks_like_html(&ctx.path, &text);
    tracing::debug!(is_html, rewrite = ctx.rewrite, "Done. Rendering…");
    if ctx.rewrite && is_html {
        let rewritten = rewrite_assets(&text, &urls.content_root).into_owned();
        return Outcome::Document(rewritten);
    }
    Outcome::Document(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
