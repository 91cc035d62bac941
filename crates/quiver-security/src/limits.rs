use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::SecurityError;

/// A YAML parse failure, annotated with the path of the offending field.
pub type YamlError = serde_path_to_error::Error<serde_yaml::Error>;

/// Stat `path` and fail with [`SecurityError::TooLarge`] if it exceeds
/// `max_bytes`. Returns the actual size on success.
pub fn check_file_size(path: &Path, max_bytes: u64) -> Result<u64, SecurityError> {
    let size = fs_err::metadata(path)?.len();
    if size > max_bytes {
        return Err(SecurityError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: max_bytes,
        });
    }
    Ok(size)
}

/// Parse a YAML document under a hard wall-clock deadline.
///
/// The parse runs on the blocking pool; a document that keeps the parser
/// busy past `deadline` (hostile nesting, alias bombs) yields
/// [`SecurityError::ParseTimeout`] and is treated as malicious input. The
/// inner result carries ordinary syntax/schema failures, which belong to the
/// caller.
///
/// The deserializer rejects non-plain YAML by construction: no custom tags
/// and no language-specific constructors ever produce a value.
pub async fn parse_yaml_with_timeout<T>(
    bytes: Vec<u8>,
    deadline: Duration,
) -> Result<Result<T, YamlError>, SecurityError>
where
    T: DeserializeOwned + Send + 'static,
{
    let parse = tokio::task::spawn_blocking(move || {
        let deserializer = serde_yaml::Deserializer::from_slice(&bytes);
        serde_path_to_error::deserialize::<_, T>(deserializer)
    });
    match tokio::time::timeout(deadline, parse).await {
        Ok(joined) => Ok(joined.expect("yaml parse task panicked")),
        Err(_) => Err(SecurityError::ParseTimeout { deadline }),
    }
}
