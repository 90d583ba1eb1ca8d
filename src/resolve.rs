//! Query parameter parsing and URL derivation.
//!
//! A request's query string becomes a [`ResolutionContext`]; the context plus
//! the configured [`Endpoints`] yields every outbound URL as plain string
//! templates.  Nothing here validates owner, repository, or path values:
//! malformed input simply produces a malformed URL.

use serde::Serialize;

pub const DEFAULT_OWNER: &str = "kode-cat";
pub const DEFAULT_REPO: &str = "tiiny";
pub const DEFAULT_PATH: &str = "index.html";
pub const DEFAULT_REFERENCE: &str = "latest";

pub const DEFAULT_CDN_BASE: &str = "https://cdn.jsdelivr.net/gh";
pub const DEFAULT_SOURCE_BASE: &str = "https://github.com";
pub const DEFAULT_EDITOR_BASE: &str = "https://github.dev";
pub const DEFAULT_SANDBOX_BASE: &str = "https://stackblitz.com/github";

// ---------------------------------------------------------------------------
// Return mode
// ---------------------------------------------------------------------------

/// How a request should be answered, selected by the `rtn` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnMode {
    /// `rtn=raw`: redirect to the file on the CDN.
    Raw,
    /// `rtn=ghr`: redirect to the file on the source-hosting site.
    Viewer,
    /// `rtn=ghs`: open the file in the web editor.
    Editor,
    /// `rtn=stz`: open the repository in the in-browser sandbox.
    Sandbox,
    /// `rtn=scd`: syntax-highlighted code view.
    Highlighted,
}

impl ReturnMode {
    /// Map an `rtn` value to a mode.  Unknown values map to `None`, which
    /// selects the default document render.
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "raw" => Some(Self::Raw),
            "ghr" => Some(Self::Viewer),
            "ghs" => Some(Self::Editor),
            "stz" => Some(Self::Sandbox),
            "scd" => Some(Self::Highlighted),
            _ => None,
        }
    }

    /// Short label used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Sandbox => "sandbox",
            Self::Highlighted => "highlighted",
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution context
// ---------------------------------------------------------------------------

/// Everything a single request asked for, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionContext {
    pub owner: String,
    pub repo: String,
    pub path: String,
    /// Branch, tag, or commit (`rfnc`).
    pub reference: String,
    pub mode: Option<ReturnMode>,
    /// `false` only when `rwrt` is `"false"` or `"0"`.
    pub rewrite: bool,
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::from_query("")
    }
}

impl ResolutionContext {
    /// Build a context from a raw query string (without the leading `?`).
    ///
    /// Values are form-urlencoded decoded.  A key that is present with an
    /// empty value keeps the empty value; only an absent key falls back to
    /// its default.  When a key repeats, the first occurrence wins.
    pub fn from_query(query: &str) -> Self {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let param = |key: &str| first_value(&pairs, key);

        Self {
            owner: param("user").unwrap_or(DEFAULT_OWNER).to_owned(),
            repo: param("repo").unwrap_or(DEFAULT_REPO).to_owned(),
            path: param("path").unwrap_or(DEFAULT_PATH).to_owned(),
            reference: param("rfnc").unwrap_or(DEFAULT_REFERENCE).to_owned(),
            mode: param("rtn").and_then(ReturnMode::from_param),
            rewrite: !matches!(param("rwrt"), Some("false" | "0")),
        }
    }

    /// Last `/`-separated segment of the path.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Lowercase extension of the file name, or `""` when it has none.
    pub fn extension(&self) -> String {
        extension(&self.path).to_ascii_lowercase()
    }

    /// Uppercase extension shown in the page header; `TXT` when absent.
    pub fn file_type_label(&self) -> String {
        match extension(&self.path) {
            "" => "TXT".to_owned(),
            ext => ext.to_ascii_uppercase(),
        }
    }
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Extension of the last path segment (text after its final `.`).
///
/// Returns `""` for names without a dot and for names ending in a dot.
pub fn extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(pos) => &name[pos + 1..],
        None => "",
    }
}

// ---------------------------------------------------------------------------
// Endpoints and derived URLs
// ---------------------------------------------------------------------------

/// Base URLs of the outbound services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub cdn: String,
    pub source: String,
    pub editor: String,
    pub sandbox: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(
            DEFAULT_CDN_BASE,
            DEFAULT_SOURCE_BASE,
            DEFAULT_EDITOR_BASE,
            DEFAULT_SANDBOX_BASE,
        )
    }
}

impl Endpoints {
    /// Trailing slashes are trimmed so templates never produce `//`.
    pub fn new(cdn: &str, source: &str, editor: &str, sandbox: &str) -> Self {
        Self {
            cdn: cdn.trim_end_matches('/').to_owned(),
            source: source.trim_end_matches('/').to_owned(),
            editor: editor.trim_end_matches('/').to_owned(),
            sandbox: sandbox.trim_end_matches('/').to_owned(),
        }
    }
}

/// All URLs derived from one [`ResolutionContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedUrls {
    /// `<cdn>/<owner>/<repo>@<ref>`; relative assets resolve against this.
    pub content_root: String,
    /// `<content_root>/<path>`.
    pub file: String,
    /// File page on the source-hosting site.
    pub repo_page: String,
    /// File opened in the web editor.
    pub editor: String,
    /// Repository opened in the in-browser sandbox.
    pub sandbox: String,
}

impl ResolvedUrls {
    pub fn resolve(ctx: &ResolutionContext, endpoints: &Endpoints) -> Self {
        let ResolutionContext {
            owner,
            repo,
            path,
            reference,
            ..
        } = ctx;
        let content_root = format!("{}/{owner}/{repo}@{reference}", endpoints.cdn);
        let file = format!("{content_root}/{path}");
        Self {
            repo_page: format!("{}/{owner}/{repo}/blob/{reference}/{path}", endpoints.source),
            editor: format!("{}/{owner}/{repo}/blob/{reference}/{path}", endpoints.editor),
            sandbox: format!("{}/{owner}/{repo}", endpoints.sandbox),
            content_root,
            file,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- from_query ---

    #[test]
    fn empty_query_uses_defaults() {
        let ctx = ResolutionContext::from_query("");
        assert_eq!(ctx.owner, "kode-cat");
        assert_eq!(ctx.repo, "tiiny");
        assert_eq!(ctx.path, "index.html");
        assert_eq!(ctx.reference, "latest");
        assert_eq!(ctx.mode, None);
        assert!(ctx.rewrite);
    }

    #[test]
    fn all_params_read() {
        let ctx = ResolutionContext::from_query(
            "user=acme&repo=site&path=docs/a.md&rfnc=v1.2&rtn=scd&rwrt=false",
        );
        assert_eq!(ctx.owner, "acme");
        assert_eq!(ctx.repo, "site");
        assert_eq!(ctx.path, "docs/a.md");
        assert_eq!(ctx.reference, "v1.2");
        assert_eq!(ctx.mode, Some(ReturnMode::Highlighted));
        assert!(!ctx.rewrite);
    }

    #[test]
    fn present_but_empty_value_is_kept() {
        let ctx = ResolutionContext::from_query("user=&path=");
        assert_eq!(ctx.owner, "");
        assert_eq!(ctx.path, "");
    }

    #[test]
    fn first_value_wins_on_repeat() {
        let ctx = ResolutionContext::from_query("user=first&user=second");
        assert_eq!(ctx.owner, "first");
    }

    #[test]
    fn values_are_form_decoded() {
        let ctx = ResolutionContext::from_query("path=my%20dir/a+b.html&rfnc=feat%2Fx");
        assert_eq!(ctx.path, "my dir/a b.html");
        assert_eq!(ctx.reference, "feat/x");
    }

    #[test]
    fn malformed_escape_kept_literally() {
        let ctx = ResolutionContext::from_query("path=100%zz.txt");
        assert_eq!(ctx.path, "100%zz.txt");
    }

    #[test]
    fn rewrite_disabled_only_by_false_or_zero() {
        assert!(!ResolutionContext::from_query("rwrt=false").rewrite);
        assert!(!ResolutionContext::from_query("rwrt=0").rewrite);
        assert!(ResolutionContext::from_query("rwrt=").rewrite);
        assert!(ResolutionContext::from_query("rwrt=no").rewrite);
        assert!(ResolutionContext::from_query("rwrt=FALSE").rewrite);
        assert!(ResolutionContext::from_query("rwrt=true").rewrite);
    }

    // --- ReturnMode ---

    #[test]
    fn return_mode_params() {
        assert_eq!(ReturnMode::from_param("raw"), Some(ReturnMode::Raw));
        assert_eq!(ReturnMode::from_param("ghr"), Some(ReturnMode::Viewer));
        assert_eq!(ReturnMode::from_param("ghs"), Some(ReturnMode::Editor));
        assert_eq!(ReturnMode::from_param("stz"), Some(ReturnMode::Sandbox));
        assert_eq!(ReturnMode::from_param("scd"), Some(ReturnMode::Highlighted));
    }

    #[test]
    fn unknown_return_mode_is_none() {
        assert_eq!(ReturnMode::from_param(""), None);
        assert_eq!(ReturnMode::from_param("RAW"), None);
        assert_eq!(ResolutionContext::from_query("rtn=bogus").mode, None);
    }

    // --- labels ---

    #[test]
    fn file_name_and_type_label() {
        let ctx = ResolutionContext::from_query("path=src/lib/main.rs");
        assert_eq!(ctx.file_name(), "main.rs");
        assert_eq!(ctx.file_type_label(), "RS");
        assert_eq!(ctx.extension(), "rs");
    }

    #[test]
    fn type_label_defaults_to_txt() {
        assert_eq!(ResolutionContext::from_query("path=Makefile").file_type_label(), "TXT");
        assert_eq!(ResolutionContext::from_query("path=notes.").file_type_label(), "TXT");
    }

    #[test]
    fn extension_ignores_dots_in_directories() {
        assert_eq!(extension("v1.2/README"), "");
        assert_eq!(extension("a.b/c.TAR.GZ"), "GZ");
        assert_eq!(extension(".gitignore"), "gitignore");
    }

    // --- ResolvedUrls ---

    #[test]
    fn urls_from_default_endpoints() {
        let ctx = ResolutionContext::from_query("user=acme&repo=site&path=a/b.txt&rfnc=main");
        let urls = ResolvedUrls::resolve(&ctx, &Endpoints::default());
        assert_eq!(urls.content_root, "https://cdn.jsdelivr.net/gh/acme/site@main");
        assert_eq!(urls.file, "https://cdn.jsdelivr.net/gh/acme/site@main/a/b.txt");
        assert_eq!(urls.repo_page, "https://github.com/acme/site/blob/main/a/b.txt");
        assert_eq!(urls.editor, "https://github.dev/acme/site/blob/main/a/b.txt");
        assert_eq!(urls.sandbox, "https://stackblitz.com/github/acme/site");
    }

    #[test]
    fn custom_cdn_base_trailing_slash_trimmed() {
        let endpoints = Endpoints::new(
            "https://cdn.example/",
            DEFAULT_SOURCE_BASE,
            DEFAULT_EDITOR_BASE,
            DEFAULT_SANDBOX_BASE,
        );
        let ctx = ResolutionContext::from_query("user=acme&repo=site&path=a.txt");
        let urls = ResolvedUrls::resolve(&ctx, &endpoints);
        assert_eq!(urls.content_root, "https://cdn.example/acme/site@latest");
        assert_eq!(urls.file, "https://cdn.example/acme/site@latest/a.txt");
    }

    #[test]
    fn malformed_values_propagate_unvalidated() {
        let ctx = ResolutionContext::from_query("user=a b&repo=&path=../x");
        let urls = ResolvedUrls::resolve(&ctx, &Endpoints::default());
        assert_eq!(urls.file, "https://cdn.jsdelivr.net/gh/a b/@latest/../x");
    }
}
