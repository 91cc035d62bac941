use serde::{Deserialize, Serialize};
use url::Url;

/// Where a resource's content comes from.
///
/// The URL is parsed eagerly; scheme and host policy are enforced by the
/// security layer before any file derived from this source is loaded or
/// fetched. `repo` and `path` are advisory display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Source {
    pub url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Source {
    /// Whether `digest` looks like a SHA-256 hex digest (64 lowercase hex
    /// characters).
    pub fn is_valid_sha256(digest: &str) -> bool {
        digest.len() == 64
            && digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}
