//! Crate-level error type for startup and CLI failures.
//!
//! Request handling never produces these: a failed fetch becomes a not-found
//! page, not an `Error`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No port in the retry window could be bound.
    #[error("{0}")]
    Bind(String),

    /// `--theme` names a theme that is not bundled.
    #[error("unknown theme `{name}` (available: {})", available.join(", "))]
    UnknownTheme {
        name: String,
        available: Vec<String>,
    },

    /// The outbound HTTP client could not be constructed.
    #[error("http client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Reading an input file for `rewrite` failed.
    #[error("{}: {source}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
