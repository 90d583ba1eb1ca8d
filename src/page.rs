//! Server-rendered pages: the code view, the not-found page, and the small
//! body sent along with redirects.
//!
//! Rewritten documents are not wrapped; they are returned as fetched.

use crate::resolve::{ResolutionContext, ResolvedUrls};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Labels shown in the header bar of every viewer page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    /// Last path segment, e.g. `app.py`.
    pub file_name: String,
    /// Uppercase extension, e.g. `PY`.
    pub file_type: String,
    /// Link to the file on the source-hosting site.
    pub repo_page: String,
    /// Status line, e.g. `(site@latest)/app.py`.  Cleared on failure pages.
    pub step: String,
}

impl PageHeader {
    pub fn new(ctx: &ResolutionContext, urls: &ResolvedUrls) -> Self {
        Self {
            file_name: ctx.file_name().to_owned(),
            file_type: ctx.file_type_label(),
            repo_page: urls.repo_page.clone(),
            step: format!("({}@{})/{}", ctx.repo, ctx.reference, ctx.path),
        }
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Minimal HTML entity escaping for text content and attribute values.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `class` attribute for the code element: `hljs` plus the language id.
fn code_class(language: Option<&str>) -> String {
    match language {
        Some(lang) if !lang.is_empty() => format!("hljs {}", html_escape(lang)),
        _ => "hljs".to_owned(),
    }
}

fn build_header_html(header: &PageHeader) -> String {
    format!(
        "<header class=\"sb-header\">\n\
<span id=\"filename\" class=\"filename\">{name}</span>\n\
<span id=\"filetype\" class=\"filetype\">{kind}</span>\n\
<span id=\"sb-step\" class=\"sb-step\">{step}</span>\n\
<a id=\"gh-link\" class=\"gh-link\" href=\"{href}\" target=\"_blank\" rel=\"noopener\">View on GitHub</a>\n\
</header>\n",
        name = html_escape(&header.file_name),
        kind = html_escape(&header.file_type),
        step = html_escape(&header.step),
        href = html_escape(&header.repo_page),
    )
}

/// Shared document frame around a page-specific `<main>` body.
fn build_shell(title: &str, header: &PageHeader, main_html: &str) -> String {
    let title = html_escape(title);
    let header_html = build_header_html(header);
    format!(
        "<!DOCTYPE html>\n\
<html lang=\"en\">\n\
<head>\n\
<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>{title} · cdnview</title>\n\
<link rel=\"stylesheet\" href=\"/assets/viewer.css\">\n\
</head>\n\
<body>\n\
{header_html}\
<main class=\"sb-main\">\n\
{main_html}\
</main>\n\
<script src=\"/assets/viewer.js\"></script>\n\
</body>\n\
</html>\n"
    )
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Code view: header, copy button, and the highlighted code block.
///
/// `code_html` must already be HTML-safe (it comes from a highlighter).
pub fn build_code_page(header: &PageHeader, code_html: &str, language: Option<&str>) -> String {
    let class = code_class(language);
    let main_html = format!(
        "<div id=\"code-container\" class=\"code-container\">\n\
<button class=\"copy-btn\" type=\"button\">Copy</button>\n\
<pre><code id=\"code-block\" class=\"{class}\">{code_html}</code></pre>\n\
</div>\n"
    );
    build_shell(&header.file_name, header, &main_html)
}

/// Failure page: the loader area shows `message` as an error and the status
/// line is cleared.
pub fn build_not_found_page(header: &PageHeader, message: &str) -> String {
    let header = PageHeader {
        step: String::new(),
        ..header.clone()
    };
    let main_html = format!(
        "<div id=\"sb-loader\" class=\"sb-loader\">\n\
<span class=\"err\">{}</span>\n\
</div>\n",
        html_escape(message)
    );
    build_shell(&header.file_name, &header, &main_html)
}

/// Body sent with a redirect, for clients that do not follow `Location`.
pub fn build_redirect_page(step: &str, location: &str) -> String {
    let step = html_escape(step);
    let href = html_escape(location);
    format!(
        "<!DOCTYPE html>\n\
<html lang=\"en\">\n\
<head>\n\
<meta charset=\"utf-8\">\n\
<meta http-equiv=\"refresh\" content=\"0; url={href}\">\n\
<title>{step}</title>\n\
</head>\n\
<body>\n\
<p id=\"sb-step\">{step}</p>\n\
<p><a href=\"{href}\">{href}</a></p>\n\
</body>\n\
</html>\n"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
