use thiserror::Error;

use crate::bundle::BundleError;

/// Defines errors that may occur while talking to the remote translation source
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Connection failure, timeout or interrupted body
    #[error("remote source unavailable at {url}: {source}")]
    Unavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The remote answered with a non-success status
    #[error("remote source returned {status} for {url}")]
    Status { url: String, status: reqwest::StatusCode },
    /// A success response whose body is not valid JSON
    #[error("malformed JSON from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    /// Valid JSON that does not describe a translation bundle
    #[error("unexpected document from {url}: {source}")]
    Shape {
        url: String,
        #[source]
        source: BundleError,
    },
    /// The configured base URL cannot have documents appended to it
    #[error("invalid base URL '{url}': {reason}")]
    BaseUrl { url: String, reason: String },
    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl RemoteError {
    /// Whether the remote simply had nothing to give, as opposed to giving garbage.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Status { .. })
    }
}
