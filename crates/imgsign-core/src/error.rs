//! Error types for the page pipeline.
//!
//! Every [`PageError`] is terminal for its request and is reported to clients
//! as "not found". The variant and its cause are only for server-side logs.

use std::path::PathBuf;
use std::time::Duration;

/// Convenience result alias for pipeline operations.
pub type PageResult<T> = Result<T, PageError>;

/// Errors that end a page request.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The normalized path is not strictly inside the document root.
    #[error("path escapes document root: {requested}")]
    OutOfRoot {
        /// The request path as received.
        requested: String,
    },

    /// The request path cannot be turned into a filesystem path at all.
    #[error("cannot resolve path {requested:?}: {reason}")]
    ResolutionFailed {
        /// The request path as received.
        requested: String,
        /// What made it unusable.
        reason: &'static str,
    },

    /// The file extension is not one we rewrite.
    #[error("not supported type: {}", path.display())]
    UnsupportedType {
        /// The resolved path.
        path: PathBuf,
    },

    /// The file could not be opened or read.
    #[error("open error: {}: {source}", path.display())]
    ReadFailed {
        /// The resolved path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The byte stream could not be parsed as an HTML document.
    #[error("failed to parse HTML: {reason}")]
    ParseFailed {
        /// Parser diagnostic.
        reason: String,
    },

    /// Rendering did not finish within the request timeout.
    #[error("rendering timed out after {after:?}")]
    TimedOut {
        /// The configured timeout.
        after: Duration,
    },

    /// The blocking rewrite task panicked or was cancelled.
    #[error("internal error: {reason}")]
    Internal {
        /// Task failure description.
        reason: String,
    },
}

impl PageError {
    /// Short stable name of the error kind, for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OutOfRoot { .. } => "OutOfRoot",
            Self::ResolutionFailed { .. } => "ResolutionFailed",
            Self::UnsupportedType { .. } => "UnsupportedType",
            Self::ReadFailed { .. } => "ReadFailed",
            Self::ParseFailed { .. } => "ParseFailed",
            Self::TimedOut { .. } => "TimedOut",
            Self::Internal { .. } => "Internal",
        }
    }
}
