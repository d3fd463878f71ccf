//! Error types for ring-state store operations.

use std::path::PathBuf;

/// Errors that can occur while talking to the ring-state store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A service-account credential file could not be read.
    #[error("reading credential {}: {source}", path.display())]
    Credentials {
        /// Path of the credential file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP request itself failed (transport, TLS, timeout).
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a status this client has no handling for.
    ///
    /// The response body is preserved verbatim so the operator can see the
    /// API server's own diagnostic.
    #[error("store returned status {status}: {body}")]
    Unexpected {
        /// HTTP status code.
        status: u16,
        /// Response body as received.
        body: String,
    },

    /// The record changed since it was last read.
    ///
    /// Surfaced as-is; a later invocation starts over from a fresh fetch.
    #[error("ring state changed concurrently: {detail}")]
    VersionConflict {
        /// Server-side detail of the rejected write.
        detail: String,
    },

    /// The store answered 200 but the record is not usable.
    #[error("malformed store record: {0}")]
    InvalidRecord(String),
}
