//! Embedded static web assets for the viewer pages.
//!
//! Both files are compiled into the binary via `include_str!` so the binary
//! is fully self-contained; no external asset files need to be distributed.

/// Stylesheet for the code view and the not-found page.
///
/// Loaded from `src/assets/viewer.css` at compile time.
pub const CSS: &str = include_str!("assets/viewer.css");

/// JavaScript for the code view: the copy-to-clipboard button.
///
/// Loaded from `src/assets/viewer.js` at compile time.
pub const JS: &str = include_str!("assets/viewer.js");
