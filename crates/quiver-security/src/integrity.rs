use sha2::{Digest, Sha256};

use crate::SecurityError;

/// Verify that `bytes` hash to the `expected` SHA-256 hex digest.
///
/// The comparison runs over every byte of both digests regardless of where
/// they first differ, so the time taken leaks nothing about the match
/// position.
pub fn verify_sha256(bytes: &[u8], expected: &str) -> Result<(), SecurityError> {
    let digest = Sha256::digest(bytes);
    let actual = hex::encode(digest);

    let mismatch = || SecurityError::IntegrityMismatch {
        expected: expected.to_string(),
        actual: actual.clone(),
    };

    let expected_bytes = hex::decode(expected).map_err(|_| mismatch())?;
    if expected_bytes.len() != digest.len() {
        return Err(mismatch());
    }
    let difference = expected_bytes
        .iter()
        .zip(digest.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    if difference == 0 {
        Ok(())
    } else {
        Err(mismatch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256 of the empty string.
    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn matching_digest_passes() {
        verify_sha256(b"", EMPTY).unwrap();
    }

    #[test]
    fn mismatch_reports_both_digests() {
        let err = verify_sha256(b"tampered", EMPTY).unwrap_err();
        match err {
            SecurityError::IntegrityMismatch { expected, actual } => {
                assert_eq!(expected, EMPTY);
                assert_ne!(actual, EMPTY);
                assert_eq!(actual.len(), 64);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_expected_digest_is_a_mismatch() {
        assert!(verify_sha256(b"", "zz").is_err());
        assert!(verify_sha256(b"", &"a".repeat(63)).is_err());
    }
}
