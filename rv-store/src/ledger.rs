//! Per-user append-only version ledger: fixed 512-byte-aligned
//! `FileVersion` records (spec.md §3), one ledger file per user.

use crate::error::{StoreError, StoreResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;
use rv_proto::limits::{COMMENT_MAX, FILENAME_MAX, HASH_FIELD_LEN, HASH_HEX_LEN, LEDGER_RECORD_LEN};
use hashbrown::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One record in a user's ledger.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FileVersion {
    pub filename: String,
    pub hash: String,
    pub comment: String,
}

// Wire layout of one 512-byte record:
//   u16 filename_len | filename bytes (padded to FILENAME_MAX)
//   u16 hash_len     | hash bytes     (padded to HASH_FIELD_LEN)
//   u8  comment_len  | comment bytes  (padded to COMMENT_MAX)
// The field order matches the C struct's filename/hash/comment order; the
// length prefixes replace NUL-termination since filenames and comments are
// treated as byte strings, not C strings.
const FILENAME_SLOT: usize = 2 + FILENAME_MAX;
const HASH_SLOT: usize = 2 + HASH_FIELD_LEN;
const COMMENT_SLOT: usize = 1 + COMMENT_MAX;

const _: () = assert!(FILENAME_SLOT + HASH_SLOT + COMMENT_SLOT <= LEDGER_RECORD_LEN);

impl FileVersion {
    pub fn new(filename: impl Into<String>, hash: impl Into<String>, comment: impl Into<String>) -> Self {
        FileVersion {
            filename: filename.into(),
            hash: hash.into(),
            comment: comment.into(),
        }
    }

    fn encode(&self) -> StoreResult<[u8; LEDGER_RECORD_LEN]> {
        if self.filename.len() > FILENAME_MAX {
            return Err(StoreError::CorruptRecord("filename exceeds PATH_MAX".into()));
        }
        if self.hash.len() != HASH_HEX_LEN {
            return Err(StoreError::CorruptRecord("hash is not 64 hex chars".into()));
        }
        if self.comment.len() > COMMENT_MAX {
            return Err(StoreError::CorruptRecord("comment exceeds 79 bytes".into()));
        }

        let mut record = [0u8; LEDGER_RECORD_LEN];
        let mut cur = &mut record[..];

        cur.write_u16::<LittleEndian>(self.filename.len() as u16).unwrap();
        cur[..self.filename.len()].copy_from_slice(self.filename.as_bytes());
        let mut rest = &mut record[FILENAME_SLOT..];

        rest.write_u16::<LittleEndian>(self.hash.len() as u16).unwrap();
        rest[..self.hash.len()].copy_from_slice(self.hash.as_bytes());
        let mut rest = &mut record[FILENAME_SLOT + HASH_SLOT..];

        rest.write_u8(self.comment.len() as u8).unwrap();
        rest[..self.comment.len()].copy_from_slice(self.comment.as_bytes());

        Ok(record)
    }

    fn decode(record: &[u8; LEDGER_RECORD_LEN]) -> StoreResult<FileVersion> {
        let bad = |what: &str| StoreError::CorruptRecord(format!("{what} field corrupt"));

        let mut cur = &record[..];
        let filename_len = cur.read_u16::<LittleEndian>().map_err(|_| bad("filename length"))? as usize;
        if filename_len > FILENAME_MAX {
            return Err(bad("filename length"));
        }
        let filename = std::str::from_utf8(&record[2..2 + filename_len])
            .map_err(|_| bad("filename utf8"))?
            .to_string();

        let mut cur = &record[FILENAME_SLOT..];
        let hash_len = cur.read_u16::<LittleEndian>().map_err(|_| bad("hash length"))? as usize;
        if hash_len > HASH_FIELD_LEN {
            return Err(bad("hash length"));
        }
        let hash = std::str::from_utf8(&record[FILENAME_SLOT + 2..FILENAME_SLOT + 2 + hash_len])
            .map_err(|_| bad("hash utf8"))?
            .to_string();

        let comment_off = FILENAME_SLOT + HASH_SLOT;
        let comment_len = record[comment_off] as usize;
        if comment_len > COMMENT_MAX {
            return Err(bad("comment length"));
        }
        let comment = std::str::from_utf8(&record[comment_off + 1..comment_off + 1 + comment_len])
            .map_err(|_| bad("comment utf8"))?
            .to_string();

        Ok(FileVersion { filename, hash, comment })
    }
}

/// One user's append-only ledger file, guarded by an in-process mutex so a
/// panic mid-append still releases the lock (scoped `MutexGuard` drop),
/// matching the "per-file advisory locking" discipline from spec.md §9.
struct LedgerFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LedgerFile {
    fn open_handle(&self) -> StoreResult<File> {
        Ok(OpenOptions::new().read(true).write(true).create(true).open(&self.path)?)
    }

    fn read_all(&self) -> StoreResult<Vec<FileVersion>> {
        let _guard = self.lock.lock();
        self.read_all_unlocked()
    }

    fn read_all_unlocked(&self) -> StoreResult<Vec<FileVersion>> {
        let mut file = self.open_handle()?;
        let len = file.metadata()?.len();
        if len % LEDGER_RECORD_LEN as u64 != 0 {
            return Err(StoreError::CorruptRecord(format!(
                "ledger file size {len} is not a multiple of {LEDGER_RECORD_LEN}"
            )));
        }

        file.seek(SeekFrom::Start(0))?;
        let count = (len / LEDGER_RECORD_LEN as u64) as usize;
        let mut records = Vec::with_capacity(count);
        let mut buf = [0u8; LEDGER_RECORD_LEN];
        for _ in 0..count {
            file.read_exact(&mut buf)?;
            records.push(FileVersion::decode(&buf)?);
        }
        Ok(records)
    }

    fn append(&self, version: &FileVersion) -> StoreResult<()> {
        let _guard = self.lock.lock();
        let record = version.encode()?;
        let mut file = self.open_handle()?;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&record)?;
        file.flush()?;
        Ok(())
    }
}

/// Per-user append-only version ledger. Owns one [`LedgerFile`] per
/// username, created lazily on first access, so distinct users' `ADD`s
/// never contend on the same lock (spec.md §5: "each appends into its own
/// per-user ledger under its own lock").
pub struct VersionLedger {
    root: PathBuf,
    files: Mutex<HashMap<String, Arc<LedgerFile>>>,
}

impl VersionLedger {
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<VersionLedger> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(VersionLedger {
            root,
            files: Mutex::new(HashMap::new()),
        })
    }

    fn file_for(&self, username: &str) -> Arc<LedgerFile> {
        let mut files = self.files.lock();
        files
            .entry(username.to_string())
            .or_insert_with(|| {
                Arc::new(LedgerFile {
                    path: self.root.join(format!("versions-{username}.db")),
                    lock: Mutex::new(()),
                })
            })
            .clone()
    }

    /// All of `username`'s records, in append order.
    pub fn all(&self, username: &str) -> StoreResult<Vec<FileVersion>> {
        self.file_for(username).read_all()
    }

    /// Records matching `filename`, in append order. An empty `filename`
    /// matches everything (spec.md §4.4 LIST semantics).
    pub fn matching(&self, username: &str, filename: &str) -> StoreResult<Vec<FileVersion>> {
        let all = self.all(username)?;
        if filename.is_empty() {
            return Ok(all);
        }
        Ok(all.into_iter().filter(|v| v.filename == filename).collect())
    }

    /// Whether `(filename, hash)` is already present in `username`'s
    /// ledger (spec invariant 2).
    pub fn contains(&self, username: &str, filename: &str, hash: &str) -> StoreResult<bool> {
        Ok(self
            .all(username)?
            .iter()
            .any(|v| v.filename == filename && v.hash == hash))
    }

    /// The 1-indexed `version`-th record matching `filename`, if any.
    pub fn nth_version(&self, username: &str, filename: &str, version: usize) -> StoreResult<Option<FileVersion>> {
        if version == 0 {
            return Ok(None);
        }
        Ok(self.matching(username, filename)?.into_iter().nth(version - 1))
    }

    /// Appends a new record to `username`'s ledger. Callers are responsible
    /// for having already checked [`contains`] under the same critical
    /// section semantics the single per-user lock provides.
    pub fn append(&self, username: &str, version: &FileVersion) -> StoreResult<()> {
        self.file_for(username).append(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = VersionLedger::open(dir.path()).unwrap();

        ledger
            .append("alice", &FileVersion::new("notes.txt", "a".repeat(64), "first"))
            .unwrap();
        ledger
            .append("alice", &FileVersion::new("notes.txt", "b".repeat(64), "second"))
            .unwrap();

        let all = ledger.all("alice").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].comment, "first");
        assert_eq!(all[1].comment, "second");

        let size = fs::metadata(dir.path().join("versions-alice.db")).unwrap().len();
        assert_eq!(size % LEDGER_RECORD_LEN as u64, 0);
    }

    #[test]
    fn nth_version_is_one_indexed_and_filename_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = VersionLedger::open(dir.path()).unwrap();

        ledger.append("alice", &FileVersion::new("a.txt", "1".repeat(64), "")).unwrap();
        ledger.append("alice", &FileVersion::new("b.txt", "2".repeat(64), "")).unwrap();
        ledger.append("alice", &FileVersion::new("a.txt", "3".repeat(64), "")).unwrap();

        let v1 = ledger.nth_version("alice", "a.txt", 1).unwrap().unwrap();
        assert_eq!(v1.hash, "1".repeat(64));

        let v2 = ledger.nth_version("alice", "a.txt", 2).unwrap().unwrap();
        assert_eq!(v2.hash, "3".repeat(64));

        assert!(ledger.nth_version("alice", "a.txt", 3).unwrap().is_none());
        assert!(ledger.nth_version("alice", "a.txt", 0).unwrap().is_none());
    }

    #[test]
    fn contains_reflects_filename_hash_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = VersionLedger::open(dir.path()).unwrap();
        ledger.append("bob", &FileVersion::new("x", "f".repeat(64), "")).unwrap();

        assert!(ledger.contains("bob", "x", &"f".repeat(64)).unwrap());
        assert!(!ledger.contains("bob", "x", &"e".repeat(64)).unwrap());
        assert!(!ledger.contains("bob", "y", &"f".repeat(64)).unwrap());
    }

    #[test]
    fn distinct_users_have_independent_ledgers() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = VersionLedger::open(dir.path()).unwrap();
        ledger.append("alice", &FileVersion::new("x", "1".repeat(64), "")).unwrap();
        ledger.append("bob", &FileVersion::new("x", "1".repeat(64), "")).unwrap();

        assert_eq!(ledger.all("alice").unwrap().len(), 1);
        assert_eq!(ledger.all("bob").unwrap().len(), 1);
    }
}
