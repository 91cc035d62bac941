//! Validation primitives applied wherever untrusted input enters the engine:
//! catalog files, resource URLs, install paths, and downloaded bytes.
//!
//! Every catalog file passes size check, then deadline-bounded parse, then
//! schema validation; every URL passes scheme, host, and address checks
//! before anything connects to it. Violations are fatal for the offending
//! input and are never retried.

use std::path::PathBuf;
use std::time::Duration;

pub use crate::integrity::verify_sha256;
pub use crate::limits::{check_file_size, parse_yaml_with_timeout, YamlError};
pub use crate::path::validate_path;
pub use crate::url::{validate_url, UrlPolicy};

mod integrity;
mod limits;
mod path;
mod url;

#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Path `{path}` escapes the base directory `{}`", base.display())]
    PathTraversal { path: String, base: PathBuf },

    #[error("Unsafe URL `{url}`: {reason}")]
    UnsafeUrl { url: String, reason: String },

    #[error("File `{}` is {size} bytes, over the {limit} byte limit", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Parsing did not finish within {}ms", deadline.as_millis())]
    ParseTimeout { deadline: Duration },

    #[error("Integrity mismatch: expected sha256 `{expected}`, got `{actual}`")]
    IntegrityMismatch { expected: String, actual: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
