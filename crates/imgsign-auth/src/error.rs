//! Error types for URL signing.
//!
//! All signing failures are represented by [`SignError`]. Callers that rewrite
//! documents treat every variant as recoverable for the single reference being
//! signed.

/// Errors that can occur while building a presigned URL.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The object key is empty.
    #[error("Object key cannot be empty")]
    EmptyObjectKey,

    /// The bucket name is empty.
    #[error("Bucket name cannot be empty")]
    EmptyBucket,

    /// The endpoint is not a bare `host[:port]` value.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The requested validity is outside what the signature version allows.
    #[error("Expiry of {seconds}s is outside the allowed range 1..={max}s")]
    ExpiryOutOfRange {
        /// The requested validity in seconds.
        seconds: u64,
        /// The largest validity the signature version accepts.
        max: u64,
    },

    /// The signing clock produced an expiry timestamp that cannot be represented.
    #[error("Expiry timestamp out of range")]
    InvalidExpiryTimestamp,
}
