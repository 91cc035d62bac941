use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The persistent tier: parsed catalog documents stored as msgpack envelopes
/// under the cache root, stamped with the source file's mtime and a write
/// timestamp.
///
/// The cache is opaque to callers and strictly opportunistic: an entry is
/// used only if the source mtime still matches and the entry is younger than
/// the TTL, a corrupt entry is deleted and reloaded from source, and write
/// failures are logged and ignored.
#[derive(Debug)]
pub(crate) struct DiskCache {
    root: PathBuf,
    ttl: Duration,
}

/// A cached value stamped with freshness metadata.
#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    /// Unix millis at write time.
    written_at: i64,
    /// Source file mtime, unix millis.
    source_mtime: i64,
    data: T,
}

impl DiskCache {
    pub(crate) fn new(root: PathBuf, ttl: Duration) -> Self {
        Self { root, ttl }
    }

    pub(crate) fn read<T: DeserializeOwned>(&self, key: &str, source_mtime: SystemTime) -> Option<T> {
        let path = self.entry_path(key);
        let bytes = fs_err::read(&path).ok()?;
        let envelope: Envelope<T> = match rmp_serde::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("Broken cache entry at `{}`, removing: {err}", path.display());
                let _ = fs_err::remove_file(&path);
                return None;
            }
        };
        if envelope.source_mtime != unix_millis(source_mtime) {
            debug!("Cache entry `{key}` is stale (source changed)");
            return None;
        }
        let age = unix_millis(SystemTime::now()).saturating_sub(envelope.written_at);
        if age > i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX) {
            debug!("Cache entry `{key}` expired");
            return None;
        }
        Some(envelope.data)
    }

    pub(crate) fn write<T: Serialize>(&self, key: &str, source_mtime: SystemTime, data: &T) {
        let envelope = Envelope {
            written_at: unix_millis(SystemTime::now()),
            source_mtime: unix_millis(source_mtime),
            data,
        };
        let path = self.entry_path(key);
        if let Err(err) = self.write_entry(&path, &envelope) {
            warn!("Failed to write cache entry `{}`: {err}", path.display());
        }
    }

    pub(crate) fn clear(&self) {
        if self.root.exists() {
            if let Err(err) = fs_err::remove_dir_all(&self.root) {
                warn!("Failed to clear disk cache at `{}`: {err}", self.root.display());
            }
        }
    }

    fn write_entry<T: Serialize>(
        &self,
        path: &Path,
        envelope: &Envelope<&T>,
    ) -> std::io::Result<()> {
        let parent = path.parent().expect("cache entries always have a parent");
        fs_err::create_dir_all(parent)?;
        let bytes = rmp_serde::to_vec(envelope)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        // Write-then-rename so a concurrent reader never sees a torn entry.
        let temp = tempfile::NamedTempFile::new_in(parent)?;
        fs_err::write(temp.path(), &bytes)?;
        temp.persist(path).map_err(|err| err.error)?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.msgpack"))
    }
}

fn unix_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => i64::try_from(duration.as_millis()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("cache"), Duration::from_secs(60));
        let mtime = SystemTime::now();

        cache.write("agents/architect", mtime, &"payload".to_string());
        let value: Option<String> = cache.read("agents/architect", mtime);
        assert_eq!(value.as_deref(), Some("payload"));
    }

    #[test]
    fn mtime_change_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("cache"), Duration::from_secs(60));
        let mtime = SystemTime::now();

        cache.write("index", mtime, &1u32);
        let moved = mtime + Duration::from_secs(5);
        assert_eq!(cache.read::<u32>("index", moved), None);
    }

    #[test]
    fn expired_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("cache"), Duration::ZERO);
        let mtime = SystemTime::now() - Duration::from_secs(10);

        cache.write("index", mtime, &1u32);
        assert_eq!(cache.read::<u32>("index", mtime), None);
    }

    #[test]
    fn corruption_falls_through_and_removes_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().to_path_buf(), Duration::from_secs(60));
        let mtime = SystemTime::now();

        let path = dir.path().join("index.msgpack");
        fs_err::write(&path, b"definitely not msgpack").unwrap();
        assert_eq!(cache.read::<u32>("index", mtime), None);
        assert!(!path.exists());
    }
}
