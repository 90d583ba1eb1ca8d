//! Syntax highlighting for the code view.
//!
//! The dispatcher only asks for "markup for this text in this language"; the
//! engine behind [`Highlight`] is chosen at startup.

use std::collections::HashMap;
use std::sync::LazyLock;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::error::Error;
use crate::page::html_escape;

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Default syntaxes, loaded once.
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Default themes, loaded once.
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// File extension → highlighter language id.
static LANGUAGE_TAGS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("php", "php"),
        ("js", "javascript"),
        ("ts", "typescript"),
        ("py", "python"),
        ("css", "css"),
        ("html", "xml"),
        ("json", "json"),
        ("md", "markdown"),
        ("sh", "bash"),
        ("c", "c"),
        ("cpp", "cpp"),
        ("h", "cpp"),
        ("java", "java"),
        ("go", "go"),
        ("rs", "rust"),
        ("dart", "dart"),
        ("cs", "csharp"),
        ("rb", "ruby"),
    ])
});

/// Language ids that syntect knows under a different token.
const SYNTECT_ALIASES: &[(&str, &str)] = &[("csharp", "cs")];

/// Look up the language id for a lowercase file extension.
///
/// Unknown extensions return `None`; the code view then renders unstyled.
pub fn language_tag(extension: &str) -> Option<&'static str> {
    LANGUAGE_TAGS.get(extension).copied()
}

/// A highlighting engine.
///
/// Implementations return HTML-safe markup for the inside of a `<code>`
/// element and never fail: anything they cannot highlight comes back as
/// escaped plain text.
pub trait Highlight: Send + Sync {
    fn highlight(&self, code: &str, language: Option<&str>) -> String;

    /// Engine name for logs.
    fn name(&self) -> &'static str;
}

/// Escapes only.
pub struct PlainHighlighter;

impl Highlight for PlainHighlighter {
    fn highlight(&self, code: &str, _language: Option<&str>) -> String {
        html_escape(code)
    }

    fn name(&self) -> &'static str {
        "plain"
    }
}

/// Inline-styled spans from syntect's bundled grammars and themes.
pub struct SyntectHighlighter {
    theme: &'static Theme,
}

impl SyntectHighlighter {
    /// Select a bundled theme by name.
    pub fn new(theme_name: &str) -> Result<Self, Error> {
        let theme = THEME_SET
            .themes
            .get(theme_name)
            .ok_or_else(|| Error::UnknownTheme {
                name: theme_name.to_owned(),
                available: THEME_SET.themes.keys().cloned().collect(),
            })?;
        Ok(Self { theme })
    }

    fn try_highlight(&self, code: &str, language: &str) -> Option<String> {
        let syntax = find_syntax(language)?;
        let mut highlighter = HighlightLines::new(syntax, self.theme);
        let mut out = String::with_capacity(code.len() * 2);
        for line in LinesWithEndings::from(code) {
            let ranges = highlighter.highlight_line(line, &SYNTAX_SET).ok()?;
            let html = styled_line_to_highlighted_html(&ranges[..], IncludeBackground::No).ok()?;
            out.push_str(&html);
        }
        Some(out)
    }
}

fn find_syntax(language: &str) -> Option<&'static SyntaxReference> {
    SYNTAX_SET.find_syntax_by_token(language).or_else(|| {
        let (_, token) = SYNTECT_ALIASES.iter().find(|(id, _)| *id == language)?;
        SYNTAX_SET.find_syntax_by_token(token)
    })
}

impl Highlight for SyntectHighlighter {
    fn highlight(&self, code: &str, language: Option<&str>) -> String {
        let highlighted = language.and_then(|lang| self.try_highlight(code, lang));
        match highlighted {
            Some(html) => html,
            None => {
                tracing::debug!(language = language.unwrap_or(""), "highlight fell back to plain text");
                html_escape(code)
            }
        }
    }

    fn name(&self) -> &'static str {
        "syntect"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
