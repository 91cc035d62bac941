//! The installer: executes an [`InstallPlan`](resource_types::InstallPlan)
//! against the per-user directory.
//!
//! Per file, installation is all-or-nothing: content is written to a sibling
//! temporary file, fsynced, and renamed over the final path, so a reader
//! sees either the previous file or the new one, never a torn write. Across
//! a batch, execution is best-effort: one resource's failure blocks its
//! dependents but the rest of the batch proceeds, and the report records
//! every outcome.

use resource_types::ResourceId;

use quiver_security::SecurityError;

pub use crate::batch::{BatchReport, InstallOutcome};
pub use crate::history::InstallHistory;
pub use crate::install::Installer;
pub use crate::reporter::{EventLog, ProgressEvent, ProgressSink};
pub use crate::rollback::RollbackReport;

mod batch;
mod history;
mod install;
mod reporter;
mod rollback;

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// Integrity mismatch or path traversal; fatal and never retried.
    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Client(#[from] quiver_client::Error),

    #[error("Resource `{id}` was not supplied with the plan")]
    UnknownResource { id: ResourceId },

    #[error("The install was canceled")]
    Canceled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Whether this error came from cooperative cancellation rather than a
    /// real failure.
    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            InstallError::Canceled | InstallError::Client(quiver_client::Error::Canceled)
        )
    }
}
