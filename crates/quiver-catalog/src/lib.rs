//! Catalog loading: the bridge between the YAML tree on disk and validated
//! in-memory [`Resource`](resource_types::Resource) values.
//!
//! The loader is the only component that reads catalog files. Every file
//! passes a size check, a deadline-bounded strict YAML parse, schema
//! validation, and security validation of its source URL and install path
//! before the resource is admitted. Loaded values are cached in a two-tier
//! cache: a bounded in-process LRU and an opaque on-disk cache that is safe
//! to delete or corrupt at any time.

use std::path::PathBuf;

use resource_types::{InvalidResourceId, ResourceKind, SchemaViolation};
use quiver_security::SecurityError;

pub use crate::loader::{CatalogLimits, CatalogLoader};
pub use crate::memory::CacheStats;

mod disk;
mod loader;
mod memory;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Resource `{kind}/{id}` was not found in the catalog")]
    NotFound { kind: ResourceKind, id: String },

    #[error("Catalog index not found at `{}`", path.display())]
    IndexNotFound { path: PathBuf },

    #[error("Invalid `{field}` in `{}`: {message}", path.display())]
    InvalidSchema {
        path: PathBuf,
        field: String,
        message: String,
    },

    #[error(transparent)]
    InvalidId(#[from] InvalidResourceId),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub(crate) fn invalid_schema(path: PathBuf, violation: SchemaViolation) -> Self {
        Self::InvalidSchema {
            path,
            field: violation.field,
            message: violation.message,
        }
    }

    pub(crate) fn from_yaml(path: PathBuf, err: &quiver_security::YamlError) -> Self {
        let mut field = err.path().to_string();
        if field == "." {
            field = "document".to_string();
        }
        Self::InvalidSchema {
            path,
            field,
            message: err.inner().to_string(),
        }
    }
}
