use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

use crate::SecurityError;

/// Validate that `requested`, resolved against `base`, stays inside `base`.
///
/// The string form is NFKC-normalized first: characters like U+FF0E, U+FE52,
/// and U+2024 all normalize to `.`, so a path that contains no literal `..`
/// but gains one under normalization is a disguised traversal and is
/// rejected outright. The normalized path is then resolved lexically
/// (`.`/`..` components), joined onto the canonicalized base, and any
/// symlinks in its existing prefix are resolved before the final
/// containment check.
///
/// Returns the absolute path to write to. The path itself may not exist yet;
/// `base` must.
pub fn validate_path(requested: &str, base: &Path) -> Result<PathBuf, SecurityError> {
    let traversal = || SecurityError::PathTraversal {
        path: requested.to_string(),
        base: base.to_path_buf(),
    };

    let normalized: String = requested.nfkc().collect();
    if !requested.contains("..") && normalized.contains("..") {
        return Err(traversal());
    }

    let relative = Path::new(&normalized);
    if relative.is_absolute() {
        return Err(traversal());
    }

    // Lexical resolution: `.` drops out, `..` pops, popping past the base is
    // a traversal. Root and prefix components only occur on absolute paths.
    let mut parts: Vec<OsString> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_os_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(traversal());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(traversal()),
        }
    }
    if parts.is_empty() {
        // The request resolved to the base directory itself.
        return Err(traversal());
    }

    let canonical_base = dunce::canonicalize(base).or_else(|_| std::path::absolute(base))?;
    let mut resolved = canonical_base.clone();
    for part in &parts {
        resolved.push(part);
    }

    // Resolve symlinks in the deepest existing ancestor: if any existing
    // directory on the way to the target points outside the base, the write
    // would land outside the base too.
    let mut probe = resolved.clone();
    let real = loop {
        match dunce::canonicalize(&probe) {
            Ok(real) => break real,
            Err(_) => {
                if !probe.pop() {
                    break canonical_base.clone();
                }
            }
        }
    };
    if !real.starts_with(&canonical_base) {
        return Err(traversal());
    }

    Ok(resolved)
}
