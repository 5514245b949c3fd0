//! Crate-wide error type and result alias.

use std::time::Duration;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DocError>;

/// Errors surfaced by the ingestion pipeline and the dialogue engine.
///
/// Classification failures never appear here: intent classification
/// degrades to the general-query path instead of failing the turn.
#[derive(Debug, Error)]
pub enum DocError {
    /// Both fetch strategies failed for a source URL. Fatal to ingestion.
    #[error("fetch failed for {url}: primary: {primary}; fallback: {fallback}")]
    Fetch {
        url: String,
        primary: String,
        fallback: String,
    },

    /// The page fetched fine but sanitizing left nothing to index.
    #[error("no indexable text at {url}")]
    EmptyDocument { url: String },

    /// Transport-level HTTP error from a provider or the direct fetch path.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// SQLite storage error (chunks, turns, or jobs).
    #[error("storage error: {0}")]
    Storage(String),

    /// Embedding provider returned an error or a malformed response.
    #[error("embedding provider error: {0}")]
    Embedding(String),

    /// Language-model backend returned an error or a malformed response.
    #[error("generation error: {0}")]
    Generation(String),

    /// An operation exceeded its configured deadline.
    #[error("operation timed out after {0:?}")]
    Deadline(Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

impl From<tokio_rusqlite::Error> for DocError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        DocError::Storage(err.to_string())
    }
}

impl From<tokio_rusqlite::rusqlite::Error> for DocError {
    fn from(err: tokio_rusqlite::rusqlite::Error) -> Self {
        DocError::Storage(err.to_string())
    }
}
