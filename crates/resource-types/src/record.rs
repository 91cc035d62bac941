use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ResourceId;

/// One line of the per-user install history (JSON Lines).
///
/// Records are append-only: a reinstall appends a fresh record rather than
/// mutating the old one, and only an explicit compaction rewrites the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    pub id: ResourceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub installed_at: DateTime<Utc>,
    /// The absolute path the content was written to.
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_line_round_trip() {
        let record = InstallRecord {
            id: "architect".parse().unwrap(),
            version: Some("1.2.0".to_string()),
            sha256: Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".into()),
            installed_at: Utc::now(),
            path: PathBuf::from("/home/user/.claude/agents/architect.md"),
        };
        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(serde_json::from_str::<InstallRecord>(&line).unwrap(), record);
    }
}
