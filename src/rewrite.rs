//! Asset path rewriting for HTML documents served from a CDN root.
//!
//! A static-site export references its scripts, stylesheets, and images with
//! paths relative to its own origin.  When the same file is rendered from a
//! different origin those references break, so every relative `src`/`href`
//! on `script`, `link`, `img`, and `a` tags, and every relative `url(...)`
//! in embedded style text, is rewritten to an absolute URL under the content
//! root.
//!
//! Both passes are textual.  They are not a markup parser: nested or
//! malformed markup may be matched incorrectly, and that is accepted.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Opening tag from the allow-list carrying a quoted `src` or `href`.
///
/// Groups: 1 = everything from `<` up to the attribute name (tag name and any
/// preceding attributes), 2 = tag name, 3 = attribute name, 4/5 = double- or
/// single-quoted value.
static TAG_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(<(script|link|img|a)\b[^>]*?\s)(src|href)\s*=\s*(?:"([^"]+)"|'([^']+)')"#,
    )
    .expect("TAG_ATTR_RE: hardcoded regex is valid")
});

/// `url(...)` with a double-quoted, single-quoted, or bare value.
static STYLE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]+)"|'([^']+)'|([^"'()\s]+))\s*\)"#)
        .expect("STYLE_URL_RE: hardcoded regex is valid")
});

/// Leading tag that marks text as HTML even without an `.html` extension.
static HTML_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^<(!doctype|html|head|body|meta|title|link|script|style|div|span|h1|h2|h3|p|a|img|form)\b",
    )
    .expect("HTML_PREFIX_RE: hardcoded regex is valid")
});

/// Prefixes of references that already resolve on their own (or are not
/// fetchable assets at all).  Compared case-insensitively.
const ABSOLUTE_PREFIXES: &[&str] = &[
    "http:",
    "https:",
    "//",
    "data:",
    "mailto:",
    "javascript:",
    "tel:",
    "#",
];

/// File extensions that are always treated as HTML.
const HTML_EXTENSIONS: &[&str] = &["html", "htm"];

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Return `true` when `value` must be left untouched by both passes.
///
/// Protocol-relative `//host/...` references count as absolute in the tag
/// pass and the style pass alike.
pub fn is_absolute_reference(value: &str) -> bool {
    ABSOLUTE_PREFIXES.iter().any(|prefix| {
        value
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}

/// Strip at most one leading `./` or `/`.
fn strip_relative_prefix(value: &str) -> &str {
    value
        .strip_prefix("./")
        .or_else(|| value.strip_prefix('/'))
        .unwrap_or(value)
}

/// Join a relative reference onto the content root.
fn absolutize(content_root: &str, value: &str) -> String {
    format!("{}/{}", content_root, strip_relative_prefix(value))
}

/// Decide whether fetched text should go through [`rewrite_assets`].
///
/// True when the path ends in an HTML extension (case-insensitive), or when
/// the content, after leading whitespace, opens with one of a fixed set of
/// common HTML tags.  Plain text that merely contains `url(` somewhere is
/// never classified as HTML.
pub fn looks_like_html(path: &str, content: &str) -> bool {
    let ext = crate::resolve::extension(path);
    if HTML_EXTENSIONS
        .iter()
        .any(|html_ext| ext.eq_ignore_ascii_case(html_ext))
    {
        return true;
    }
    HTML_PREFIX_RE.is_match(content.trim_start())
}

// ---------------------------------------------------------------------------
// Rewriting
// ---------------------------------------------------------------------------

/// Rewrite relative asset references in `html` to live under `content_root`.
///
/// Returns `Cow::Borrowed` when nothing needed rewriting.  Absolute
/// references (see [`is_absolute_reference`]) are left byte-for-byte
/// unchanged, which makes a second application over the output a no-op.
pub fn rewrite_assets<'a>(html: &'a str, content_root: &str) -> Cow<'a, str> {
    let mut tags = 0usize;
    let pass_one = TAG_ATTR_RE.replace_all(html, |caps: &Captures| {
        match rewrite_tag_attr(caps, content_root) {
            Some(replacement) => {
                tags += 1;
                replacement
            }
            None => caps[0].to_owned(),
        }
    });

    let mut urls = 0usize;
    let pass_two = STYLE_URL_RE.replace_all(&pass_one, |caps: &Captures| {
        match rewrite_style_url(caps, content_root) {
            Some(replacement) => {
                urls += 1;
                replacement
            }
            None => caps[0].to_owned(),
        }
    });

    tracing::debug!(tags, urls, "rewrite");

    if tags == 0 && urls == 0 {
        return Cow::Borrowed(html);
    }
    Cow::Owned(pass_two.into_owned())
}

fn rewrite_tag_attr(caps: &Captures, content_root: &str) -> Option<String> {
    let value = caps.get(4).or_else(|| caps.get(5))?.as_str();
    if is_absolute_reference(value) {
        return None;
    }
    // Fragment-only anchors are also covered by the absolute test; anchors
    // are where they occur, and they must never be rewritten.
    if caps[2].eq_ignore_ascii_case("a") && value.starts_with('#') {
        return None;
    }
    Some(format!(
        "{}{}=\"{}\"",
        &caps[1],
        &caps[3],
        absolutize(content_root, value)
    ))
}

fn rewrite_style_url(caps: &Captures, content_root: &str) -> Option<String> {
    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str();
    if is_absolute_reference(value) {
        return None;
    }
    Some(format!("url(\"{}\")", absolutize(content_root, value)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
