//! The HTTPS download client used by the installer.
//!
//! A thin wrapper over `reqwest` with retry middleware: transient failures
//! (connect errors, 5xx) are retried with exponential backoff, while client
//! errors and anything the security layer rejects fail immediately.

use quiver_security::SecurityError;

pub use crate::client::{DownloadClient, DownloadClientBuilder};

mod client;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The URL failed policy validation before any connection was made.
    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("Request to `{url}` failed ({kind})")]
    Network {
        url: String,
        kind: NetworkErrorKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Download from `{url}` exceeded the {limit} byte cap")]
    TooLarge { url: String, limit: u64 },

    #[error("The download was canceled")]
    Canceled,
}

/// What failed, at the transport level. Stable across retries: the kind
/// reported is the one observed after the retry budget was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Connect,
    Timeout,
    /// A non-success HTTP status.
    Status(u16),
    Read,
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkErrorKind::Connect => f.write_str("connect"),
            NetworkErrorKind::Timeout => f.write_str("timeout"),
            NetworkErrorKind::Status(status) => write!(f, "status {status}"),
            NetworkErrorKind::Read => f.write_str("read"),
        }
    }
}

impl Error {
    /// The status code, when the failure was an HTTP status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Network {
                kind: NetworkErrorKind::Status(status),
                ..
            } => Some(*status),
            _ => None,
        }
    }
}
