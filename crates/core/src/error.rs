//! Error types for the ingestion pipeline.
//!
//! Every stage fails fast with a single [`QuireError`]. The variants map one
//! to one onto the failure kinds a caller has to tell apart: bad input, an
//! unreachable page, bytes that are not HTML, a page without an article, and
//! storage trouble.
//!
//! # Example
//!
//! ```rust
//! use quire_core::{QuireError, normalize_url};
//!
//! match normalize_url("   ") {
//!     Err(QuireError::InvalidUrl(reason)) => println!("rejected: {reason}"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use thiserror::Error;

/// Why a fetch did not produce a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The server answered with a non-success status code.
    #[error("server responded with HTTP {status}")]
    Status { status: u16 },

    /// No complete response arrived within the configured timeout.
    #[error("request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// The redirect chain exceeded the configured limit.
    #[error("too many redirects")]
    TooManyRedirects,

    /// DNS, connection, TLS or body-read failure.
    #[error("{0}")]
    Transport(String),
}

impl FetchFailure {
    /// The HTTP status, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchFailure::Status { status } => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised by an [`ArticleStore`](crate::store::ArticleStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An article with this URL already exists.
    ///
    /// This is how the store reports a lost insert race. The ingestor
    /// recovers from it by re-reading the winner's row.
    #[error("an article for {url} already exists")]
    Duplicate { url: String },

    /// Connectivity, constraint or mapping failure in the backend.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Main error type for ingestion.
///
/// # Example
///
/// ```rust
/// use quire_core::{FetchFailure, QuireError};
///
/// let err = QuireError::FetchFailed(FetchFailure::Status { status: 404 });
/// assert!(err.to_string().contains("404"));
/// assert!(!err.is_retryable());
/// ```
#[derive(Error, Debug)]
pub enum QuireError {
    /// The input could not be normalized to an absolute http(s) URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The page could not be retrieved.
    #[error("Could not reach the page: {0}")]
    FetchFailed(FetchFailure),

    /// The fetched bytes are not processable as HTML.
    #[error("Failed to parse HTML: {0}")]
    ParseFailed(String),

    /// The page was reached and parsed but holds no article content.
    #[error("Reached the page but could not find an article in it: {reason}")]
    ExtractionFailed { reason: String },

    /// Persistence failed for a reason other than the URL uniqueness race.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// A worker task died before producing a result.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuireError {
    pub(crate) fn extraction(reason: impl Into<String>) -> Self {
        QuireError::ExtractionFailed { reason: reason.into() }
    }

    /// Whether resubmitting the same URL later could succeed.
    ///
    /// Only transient fetch failures qualify: timeouts, transport errors and
    /// 5xx/429 responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            QuireError::FetchFailed(FetchFailure::Timeout { .. } | FetchFailure::Transport(_)) => true,
            QuireError::FetchFailed(FetchFailure::Status { status }) => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type alias for QuireError.
pub type Result<T> = std::result::Result<T, QuireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuireError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_extraction_failed_is_distinct_from_fetch() {
        let extraction = QuireError::extraction("no candidates");
        let fetch = QuireError::FetchFailed(FetchFailure::Transport("connection refused".into()));

        assert!(extraction.to_string().contains("Reached the page"));
        assert!(fetch.to_string().contains("Could not reach"));
    }

    #[test]
    fn test_timeout_error() {
        let err = QuireError::FetchFailed(FetchFailure::Timeout { timeout: 30 });
        assert!(err.to_string().contains("30"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_status_retryability() {
        let not_found = QuireError::FetchFailed(FetchFailure::Status { status: 404 });
        let unavailable = QuireError::FetchFailed(FetchFailure::Status { status: 503 });
        assert!(!not_found.is_retryable());
        assert!(unavailable.is_retryable());
        assert_eq!(FetchFailure::Status { status: 404 }.status(), Some(404));
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err: QuireError = StoreError::Backend("pool closed".into()).into();
        assert_eq!(err.to_string(), "storage backend failure: pool closed");
    }
}
