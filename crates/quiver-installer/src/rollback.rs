use std::path::PathBuf;

use tracing::{debug, warn};

use crate::batch::{BatchReport, InstallOutcome};
use crate::install::{prev_path, Installer};

/// What a rollback managed to undo.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Paths the batch created that were deleted again.
    pub removed: Vec<PathBuf>,
    /// Paths whose prior content was restored from `.prev`.
    pub restored: Vec<PathBuf>,
    /// Paths that could not be undone, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Installer {
    /// Undo a batch, best-effort: files the batch created are removed,
    /// files it replaced are restored from their `.prev` parking spot.
    ///
    /// Only paths recorded as installed by this batch are touched. Residual
    /// failures are collected and logged, never raised.
    pub fn rollback_batch(&self, report: &BatchReport) -> RollbackReport {
        let mut rollback = RollbackReport::default();
        for (id, outcome) in report.outcomes.iter().rev() {
            let InstallOutcome::Installed { path, replaced, .. } = outcome else {
                continue;
            };
            if *replaced {
                let prev = prev_path(path);
                match fs_err::rename(&prev, path) {
                    Ok(()) => {
                        debug!("Restored previous version of `{id}`");
                        rollback.restored.push(path.clone());
                    }
                    Err(err) => {
                        warn!("Failed to restore `{}`: {err}", path.display());
                        rollback.failures.push((path.clone(), err.to_string()));
                    }
                }
            } else {
                match fs_err::remove_file(path) {
                    Ok(()) => {
                        debug!("Removed `{id}`");
                        rollback.removed.push(path.clone());
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        // Already gone; nothing to undo.
                    }
                    Err(err) => {
                        warn!("Failed to remove `{}`: {err}", path.display());
                        rollback.failures.push((path.clone(), err.to_string()));
                    }
                }
            }
        }
        rollback
    }
}
