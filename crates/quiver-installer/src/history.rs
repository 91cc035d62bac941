use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs4::fs_std::FileExt;
use resource_types::{InstallRecord, ResourceId};
use rustc_hash::FxHashMap;
use tracing::warn;

/// The per-user install history: one JSON record per line, append-only.
///
/// Appends are serialized by an in-process mutex and, across processes, by
/// an advisory lock on the file itself. The file is only ever rewritten by
/// [`InstallHistory::compact`].
#[derive(Debug)]
pub struct InstallHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

pub(crate) const HISTORY_FILE_NAME: &str = ".install-history.jsonl";

impl InstallHistory {
    pub fn new(user_base: &Path) -> Self {
        Self {
            path: user_base.join(HISTORY_FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Durable before return: the line is flushed and
    /// synced while the advisory lock is held.
    pub fn append(&self, record: &InstallRecord) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap();
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = fs_err::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.file().lock_exclusive()?;
        let result = file.write_all(&line).and_then(|()| file.sync_all());
        let _ = file.file().unlock();
        result
    }

    /// Every record, oldest first. A missing file is an empty history;
    /// corrupt lines are skipped with a warning rather than failing the
    /// read.
    pub fn read_all(&self) -> std::io::Result<Vec<InstallRecord>> {
        let contents = match fs_err::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let mut records = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<InstallRecord>(line) {
                Ok(record) => records.push(record),
                Err(err) => warn!(
                    "Skipping corrupt history line {} in `{}`: {err}",
                    number + 1,
                    self.path.display()
                ),
            }
        }
        Ok(records)
    }

    /// The most recent record per resource id.
    pub fn latest(&self) -> std::io::Result<FxHashMap<ResourceId, InstallRecord>> {
        let mut latest = FxHashMap::default();
        for record in self.read_all()? {
            latest.insert(record.id.clone(), record);
        }
        Ok(latest)
    }

    /// Rewrite the file keeping only the most recent record per id. The only
    /// operation that ever rewrites the history.
    pub fn compact(&self) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap();
        let records = {
            let contents = match fs_err::read_to_string(&self.path) {
                Ok(contents) => contents,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(err) => return Err(err),
            };
            let mut latest: FxHashMap<ResourceId, InstallRecord> = FxHashMap::default();
            let mut order: Vec<ResourceId> = Vec::new();
            for line in contents.lines().filter(|line| !line.trim().is_empty()) {
                if let Ok(record) = serde_json::from_str::<InstallRecord>(line) {
                    if !latest.contains_key(&record.id) {
                        order.push(record.id.clone());
                    }
                    latest.insert(record.id.clone(), record);
                }
            }
            order
                .into_iter()
                .map(|id| latest.remove(&id).expect("id was just inserted"))
                .collect::<Vec<_>>()
        };

        let parent = self
            .path
            .parent()
            .expect("history file always has a parent");
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        for record in &records {
            serde_json::to_writer(&mut temp, record)?;
            temp.write_all(b"\n")?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn record(id: &str, sha: &str) -> InstallRecord {
        InstallRecord {
            id: id.parse().unwrap(),
            version: None,
            sha256: Some(sha.to_string()),
            installed_at: Utc::now(),
            path: PathBuf::from(format!("/tmp/{id}")),
        }
    }

    #[test]
    fn appends_and_reads_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let history = InstallHistory::new(dir.path());

        history.append(&record("a", "1")).unwrap();
        history.append(&record("b", "2")).unwrap();
        history.append(&record("a", "3")).unwrap();

        let records = history.read_all().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id.as_str(), "a");
        assert_eq!(records[2].sha256.as_deref(), Some("3"));

        let latest = history.latest().unwrap();
        assert_eq!(
            latest[&"a".parse::<resource_types::ResourceId>().unwrap()]
                .sha256
                .as_deref(),
            Some("3")
        );
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = InstallHistory::new(dir.path());
        assert!(history.read_all().unwrap().is_empty());
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let history = InstallHistory::new(dir.path());
        history.append(&record("a", "1")).unwrap();
        {
            use std::io::Write as _;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(history.path())
                .unwrap();
            writeln!(file, "{{ not json").unwrap();
        }
        history.append(&record("b", "2")).unwrap();

        let records = history.read_all().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn compact_keeps_the_latest_record_per_id() {
        let dir = tempfile::tempdir().unwrap();
        let history = InstallHistory::new(dir.path());
        history.append(&record("a", "1")).unwrap();
        history.append(&record("b", "2")).unwrap();
        history.append(&record("a", "3")).unwrap();

        history.compact().unwrap();

        let records = history.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_str(), "a");
        assert_eq!(records[0].sha256.as_deref(), Some("3"));
        assert_eq!(records[1].id.as_str(), "b");
    }
}
