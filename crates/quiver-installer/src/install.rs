use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use resource_types::{InstallRecord, Resource};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use quiver_client::DownloadClient;
use quiver_security::{validate_path, verify_sha256, UrlPolicy};

use crate::batch::InstallOutcome;
use crate::history::InstallHistory;
use crate::reporter::{ProgressEvent, ProgressSink};
use crate::InstallError;

/// Default cap on a single downloaded resource.
pub(crate) const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Installs resources under the per-user base directory.
///
/// Holds no long-lived state beyond the history file handle; each install is
/// an independent pipeline run.
#[derive(Debug)]
pub struct Installer {
    user_base: PathBuf,
    policy: UrlPolicy,
    client: DownloadClient,
    history: InstallHistory,
    max_download_bytes: u64,
}

impl Installer {
    /// An installer writing under `user_base`, which is created if missing.
    pub fn new(
        user_base: impl Into<PathBuf>,
        policy: UrlPolicy,
        client: DownloadClient,
    ) -> std::io::Result<Self> {
        let user_base = user_base.into();
        fs_err::create_dir_all(&user_base)?;
        let history = InstallHistory::new(&user_base);
        Ok(Self {
            user_base,
            policy,
            client,
            history,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
        })
    }

    #[must_use]
    pub fn with_max_download_bytes(mut self, max_download_bytes: u64) -> Self {
        self.max_download_bytes = max_download_bytes;
        self
    }

    pub fn user_base(&self) -> &Path {
        &self.user_base
    }

    pub fn history(&self) -> &InstallHistory {
        &self.history
    }

    /// Run the install pipeline for one resource: skip check, download,
    /// integrity verification, path validation, atomic write, history
    /// append.
    ///
    /// If the final path already holds a file, it is parked as `<path>.prev`
    /// before the rename and restored if the write fails, so the prior
    /// content survives any per-file failure.
    #[instrument(skip_all, fields(id = %resource.id))]
    pub(crate) async fn install_one(
        &self,
        resource: &Resource,
        force: bool,
        cancel: &CancellationToken,
        sink: Option<&Arc<dyn ProgressSink>>,
    ) -> Result<InstallOutcome, InstallError> {
        let emit = |event: ProgressEvent| {
            if let Some(sink) = sink {
                sink.on_event(event);
            }
        };
        let id = resource.id.clone();
        emit(ProgressEvent::Started(id.clone()));

        if !force && self.is_installed(resource)? {
            debug!("Already installed, skipping");
            emit(ProgressEvent::Skipped(id));
            return Ok(InstallOutcome::Skipped);
        }

        if cancel.is_cancelled() {
            return Err(InstallError::Canceled);
        }

        let bytes = self
            .client
            .fetch(
                &resource.source.url,
                &self.policy,
                self.max_download_bytes,
                cancel,
            )
            .await?;
        emit(ProgressEvent::Downloaded(id.clone(), bytes.len() as u64));

        if let Some(expected) = &resource.source.sha256 {
            verify_sha256(&bytes, expected)?;
            emit(ProgressEvent::Verified(id.clone()));
        }

        let final_path = validate_path(&resource.install_path, &self.user_base)?;
        let replaced = self.write_atomic(&final_path, &bytes)?;

        self.history.append(&InstallRecord {
            id: id.clone(),
            version: resource.version.clone(),
            sha256: resource.source.sha256.clone(),
            installed_at: Utc::now(),
            path: final_path.clone(),
        })?;

        emit(ProgressEvent::Installed(id, final_path.clone()));
        Ok(InstallOutcome::Installed {
            path: final_path,
            bytes: bytes.len() as u64,
            replaced,
        })
    }

    /// Whether an identical install is already on disk: the latest history
    /// record for this id carries the same digest and its file still exists.
    fn is_installed(&self, resource: &Resource) -> Result<bool, InstallError> {
        let latest = self.history.latest()?;
        let Some(record) = latest.get(&resource.id) else {
            return Ok(false);
        };
        Ok(record.sha256 == resource.source.sha256 && record.path.is_file())
    }

    /// Write `bytes` to `path` via a sibling temporary file, fsync, and
    /// atomic rename. Returns whether a prior file was parked as `.prev`.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<bool, InstallError> {
        let parent = path.parent().expect("install paths always have a parent");
        fs_err::create_dir_all(parent)?;

        let prev = prev_path(path);
        let replaced = path.is_file();
        if replaced {
            if prev.exists() {
                fs_err::remove_file(&prev)?;
            }
            fs_err::rename(path, &prev)?;
        }

        let write = || -> std::io::Result<()> {
            let mut temp = tempfile::NamedTempFile::new_in(parent)?;
            temp.write_all(bytes)?;
            temp.as_file().sync_all()?;
            temp.persist(path).map_err(|err| err.error)?;
            Ok(())
        };
        if let Err(err) = write() {
            // Undo the parking so the prior content is back in place.
            if replaced {
                let _ = fs_err::rename(&prev, path);
            }
            return Err(err.into());
        }
        Ok(replaced)
    }
}

/// `<path>.prev`: where a replaced file is parked for the duration of a
/// batch.
pub(crate) fn prev_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".prev");
    PathBuf::from(os)
}
