//! Content hashing. Treated as a pure function over a regular file, per
//! spec.md §1: `hash_file(path) -> 64-char lowercase hex SHA-256`.

use crate::error::StoreResult;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Computes the lowercase hex SHA-256 digest of the file at `path`.
pub fn hash_file(path: &Path) -> StoreResult<String> {
    guard_regular_file(path)?;
    let mut file = File::open(path)?;
    hash_reader(&mut file)
}

/// Same as [`hash_file`] but over an already-open reader, so callers that
/// just finished writing a blob don't need to reopen it from disk.
pub fn hash_reader<R: Read>(reader: &mut R) -> StoreResult<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Rejects hashing anything that isn't a regular file (spec.md §1: the
/// hash/content service is only a pure function over a regular file).
pub fn guard_regular_file(path: &Path) -> io::Result<()> {
    let meta = std::fs::metadata(path)?;
    if !meta.is_file() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_of_hello_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello\n").unwrap();

        let digest = hash_file(&path).unwrap();
        assert_eq!(
            digest,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn hash_file_rejects_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(hash_file(dir.path()).is_err());
    }
}
