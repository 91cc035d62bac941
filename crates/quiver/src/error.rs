use std::process::ExitCode;

use quiver_catalog::CatalogError;
use quiver_installer::{BatchReport, InstallError};
use quiver_resolver::ResolveError;

/// Any failure the facade can surface. Every variant keeps its stable
/// machine-readable tag from the originating layer; [`Error::exit_status`]
/// folds them onto the CLI exit-code contract.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Process exit codes shared with the external CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command succeeded.
    Success,
    /// Bad input, cancellation, or an unexpected local failure.
    UserError,
    /// A resource or the catalog itself was missing.
    NotFound,
    /// An integrity or security violation.
    SecurityError,
    /// A network failure that survived the retry budget.
    NetworkError,
    /// A missing dependency or a dependency cycle.
    DependencyError,
    /// Some resources in a batch failed while others succeeded.
    PartialFailure,
}

impl ExitStatus {
    /// The exit status a batch outcome maps to.
    pub fn for_batch(report: &BatchReport) -> Self {
        if report.is_success() {
            ExitStatus::Success
        } else {
            ExitStatus::PartialFailure
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::UserError => ExitCode::from(1),
            ExitStatus::NotFound => ExitCode::from(2),
            ExitStatus::SecurityError => ExitCode::from(3),
            ExitStatus::NetworkError => ExitCode::from(4),
            ExitStatus::DependencyError => ExitCode::from(5),
            ExitStatus::PartialFailure => ExitCode::from(6),
        }
    }
}

impl Error {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Error::Catalog(err) => match err {
                CatalogError::NotFound { .. } | CatalogError::IndexNotFound { .. } => {
                    ExitStatus::NotFound
                }
                CatalogError::InvalidSchema { .. } | CatalogError::InvalidId(_) => {
                    ExitStatus::UserError
                }
                CatalogError::Security(_) => ExitStatus::SecurityError,
                CatalogError::Io(_) => ExitStatus::UserError,
            },
            Error::Resolve(err) => match err {
                ResolveError::UnknownResource { .. } => ExitStatus::NotFound,
                ResolveError::MissingDependency { .. } | ResolveError::CycleDetected { .. } => {
                    ExitStatus::DependencyError
                }
            },
            Error::Install(err) => match err {
                InstallError::Security(_) => ExitStatus::SecurityError,
                InstallError::Client(client) => match client {
                    quiver_client::Error::Security(_) | quiver_client::Error::TooLarge { .. } => {
                        ExitStatus::SecurityError
                    }
                    quiver_client::Error::Network { .. } => ExitStatus::NetworkError,
                    quiver_client::Error::Canceled => ExitStatus::UserError,
                },
                InstallError::UnknownResource { .. } => ExitStatus::NotFound,
                InstallError::Canceled => ExitStatus::UserError,
                InstallError::Io(_) => ExitStatus::UserError,
            },
            Error::Io(_) => ExitStatus::UserError,
        }
    }
}
