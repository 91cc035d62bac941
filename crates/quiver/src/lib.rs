//! The engine facade: the single surface external UIs (CLI, TUI) depend on.
//!
//! An [`Engine`] owns the catalog loader and brokers every operation:
//! listing, search, categorization, install planning, batch installation,
//! and rollback. Loaded resources feed immutable search and category
//! snapshots that are rebuilt only on [`Engine::refresh`].

pub use quiver_catalog::{CacheStats, CatalogError};
pub use quiver_categories::CategoryStatistics;
pub use quiver_installer::{
    BatchReport, InstallError, InstallOutcome, ProgressEvent, ProgressSink, RollbackReport,
};
pub use quiver_resolver::ResolveError;
pub use quiver_search::{MatchField, SearchOptions, SearchResult};
pub use quiver_security::{SecurityError, UrlPolicy};
pub use resource_types::{
    CatalogIndex, Category, CategoryNode, CategoryTree, DependencyStrength, InstallPlan,
    InstallRecord, PlannedResource, Resource, ResourceId, ResourceKind,
};
pub use tokio_util::sync::CancellationToken;

pub use crate::engine::Engine;
pub use crate::error::{Error, ExitStatus};
pub use crate::settings::{EnvVars, Settings};

mod engine;
mod error;
mod settings;
