//! Content-addressed blob directory: `put(path, hash)`, `get(hash)`.
//! Blobs are immutable once created; writing the same hash twice is
//! idempotent by construction (same content, same name).

use crate::error::StoreResult;
use crate::hash::hash_reader;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Opens (creating if missing) the blob directory rooted at `root`.
    /// Permissions are set to 0755 on POSIX, mirroring the original
    /// `rversionsd` bootstrap.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<BlobStore> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        set_dir_permissions(&root)?;
        Ok(BlobStore { root })
    }

    pub fn path_for(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }

    pub fn exists(&self, hash: &str) -> bool {
        self.path_for(hash).is_file()
    }

    /// Writes `reader`'s bytes into the blob named `hash`, verifying on
    /// completion that the written content actually hashes to `hash` (spec
    /// invariant 5). On any failure past the point bytes started landing on
    /// disk, the half-written blob is removed (REDESIGN FLAG, SPEC_FULL.md
    /// §11.3) rather than left around as silent corruption.
    ///
    /// `reader` is read for exactly `len` bytes regardless of whether the
    /// local write succeeds, so a caller streaming from a network
    /// connection (`rversionsd::dispatch::handle_add`) never desyncs the
    /// wire framing over a local I/O failure; a failure while *reading*
    /// `reader` itself still aborts immediately, since that is the network
    /// side, not the local one.
    pub fn put<R: Read>(&self, hash: &str, reader: &mut R, len: u64) -> StoreResult<()> {
        let dest = self.path_for(hash);
        let result = self.write_blob(&dest, hash, reader, len);
        if result.is_err() {
            let _ = fs::remove_file(&dest);
        }
        result
    }

    fn write_blob<R: Read>(&self, dest: &Path, hash: &str, reader: &mut R, len: u64) -> StoreResult<()> {
        let mut file = match File::create(dest) {
            Ok(file) => file,
            Err(err) => {
                drain(reader, len)?;
                return Err(err.into());
            }
        };

        let mut remaining = len;
        let mut buf = [0u8; 64 * 1024];
        let mut write_err = None;
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            reader.read_exact(&mut buf[..chunk])?;
            if write_err.is_none() {
                if let Err(err) = file.write_all(&buf[..chunk]) {
                    write_err = Some(err);
                }
            }
            remaining -= chunk as u64;
        }
        if let Some(err) = write_err {
            return Err(err.into());
        }
        file.flush()?;
        drop(file);

        let mut verify = File::open(dest)?;
        let actual = hash_reader(&mut verify)?;
        if actual != hash {
            return Err(crate::error::StoreError::CorruptRecord(format!(
                "blob write for {hash} produced content hashing to {actual}"
            )));
        }
        Ok(())
    }

    /// Opens the blob named `hash` for streaming to a client.
    pub fn get(&self, hash: &str) -> StoreResult<(File, u64)> {
        let path = self.path_for(hash);
        let file = File::open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                crate::error::StoreError::BlobNotFound(hash.to_string())
            } else {
                crate::error::StoreError::Io(e)
            }
        })?;
        let len = file.metadata()?.len();
        Ok((file, len))
    }
}

/// Reads and discards `remaining` bytes so a reader tied to a network
/// connection stays framed even when the local blob couldn't be created.
fn drain<R: Read>(reader: &mut R, mut remaining: u64) -> io::Result<()> {
    let mut buf = [0u8; 64 * 1024];
    while remaining > 0 {
        let chunk = remaining.min(buf.len() as u64) as usize;
        reader.read_exact(&mut buf[..chunk])?;
        remaining -= chunk as u64;
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).unwrap();

        let content = b"hello\n".to_vec();
        let hash = crate::hash::hash_bytes(&content);
        store.put(&hash, &mut Cursor::new(content.clone()), content.len() as u64).unwrap();

        assert!(store.exists(&hash));
        let (mut file, len) = store.get(&hash).unwrap();
        assert_eq!(len, content.len() as u64);
        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        assert_eq!(out, content);
    }

    #[test]
    fn put_same_hash_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).unwrap();
        let content = b"world\n".to_vec();
        let hash = crate::hash::hash_bytes(&content);

        store.put(&hash, &mut Cursor::new(content.clone()), content.len() as u64).unwrap();
        store.put(&hash, &mut Cursor::new(content.clone()), content.len() as u64).unwrap();

        assert!(store.exists(&hash));
    }

    #[test]
    fn get_missing_blob_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).unwrap();
        assert!(store.get("deadbeef").is_err());
    }

    /// When the destination can't even be created, `put` still reads the
    /// full declared length from `reader` before failing, so a caller
    /// streaming the body from a network connection never desyncs its
    /// framing over a local I/O failure.
    #[test]
    fn put_drains_reader_when_destination_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let blocked_root = dir.path().join("not-a-directory");
        fs::write(&blocked_root, b"occupying this path").unwrap();
        let store = BlobStore { root: blocked_root };

        let content = b"hello\n".to_vec();
        let hash = crate::hash::hash_bytes(&content);
        let mut cursor = Cursor::new(content.clone());
        assert!(store.put(&hash, &mut cursor, content.len() as u64).is_err());
        assert_eq!(cursor.position(), content.len() as u64);
    }
}
