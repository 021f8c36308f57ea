//! Append-only user store (spec.md §3/§4.4 LOGIN/REGISTER): one fixed-width
//! record per user, guarded by a single mutex held across the whole read or
//! append (spec.md §5 shared-resource policy).

use crate::auth::{hash_password, verify_password};
use crate::error::{StoreError, StoreResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;
use rv_proto::limits::CREDENTIAL_FIELD_LEN;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

/// Width of the salted-hash digest field on disk. Wide enough for
/// `hex(salt) ++ ':' ++ hex(sha256(..))` (97 bytes) with room to spare;
/// wider than the 64-byte plaintext field spec.md originally specified
/// because hashing the password (SPEC_FULL.md §11.1) needs more room than
/// the password itself ever did.
const PASSWORD_HASH_FIELD_LEN: usize = 128;
const RECORD_LEN: usize = 2 + CREDENTIAL_FIELD_LEN + 2 + PASSWORD_HASH_FIELD_LEN;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UserRecord {
    pub username: String,
    password_hash: String,
}

impl UserRecord {
    fn encode(&self) -> StoreResult<[u8; RECORD_LEN]> {
        if self.username.len() > CREDENTIAL_FIELD_LEN {
            return Err(StoreError::CorruptRecord("username exceeds field width".into()));
        }
        if self.password_hash.len() > PASSWORD_HASH_FIELD_LEN {
            return Err(StoreError::CorruptRecord("password hash exceeds field width".into()));
        }

        let mut record = [0u8; RECORD_LEN];
        let mut cur = &mut record[..];
        cur.write_u16::<LittleEndian>(self.username.len() as u16).unwrap();
        cur[..self.username.len()].copy_from_slice(self.username.as_bytes());

        let mut rest = &mut record[2 + CREDENTIAL_FIELD_LEN..];
        rest.write_u16::<LittleEndian>(self.password_hash.len() as u16).unwrap();
        rest[..self.password_hash.len()].copy_from_slice(self.password_hash.as_bytes());

        Ok(record)
    }

    fn decode(record: &[u8; RECORD_LEN]) -> StoreResult<UserRecord> {
        let bad = |what: &str| StoreError::CorruptRecord(format!("{what} field corrupt"));

        let mut cur = &record[..];
        let username_len = cur.read_u16::<LittleEndian>().map_err(|_| bad("username length"))? as usize;
        if username_len > CREDENTIAL_FIELD_LEN {
            return Err(bad("username length"));
        }
        let username = std::str::from_utf8(&record[2..2 + username_len])
            .map_err(|_| bad("username utf8"))?
            .to_string();

        let pw_off = 2 + CREDENTIAL_FIELD_LEN;
        let mut cur = &record[pw_off..];
        let pw_len = cur.read_u16::<LittleEndian>().map_err(|_| bad("password length"))? as usize;
        if pw_len > PASSWORD_HASH_FIELD_LEN {
            return Err(bad("password length"));
        }
        let password_hash = std::str::from_utf8(&record[pw_off + 2..pw_off + 2 + pw_len])
            .map_err(|_| bad("password utf8"))?
            .to_string();

        Ok(UserRecord { username, password_hash })
    }
}

/// Append-only record of `(username, password)` pairs, one process-wide
/// file. All reads and appends happen under the same mutex (spec.md §5:
/// "single mutex, held across read or append").
pub struct UserStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl UserStore {
    /// Opens (creating if missing) the user store file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<UserStore> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(UserStore { path, lock: Mutex::new(()) })
    }

    fn read_all(&self) -> StoreResult<Vec<UserRecord>> {
        let mut file = OpenOptions::new().read(true).open(&self.path)?;
        let len = file.metadata()?.len();
        if len % RECORD_LEN as u64 != 0 {
            return Err(StoreError::CorruptRecord(format!(
                "user store size {len} is not a multiple of {RECORD_LEN}"
            )));
        }
        file.seek(SeekFrom::Start(0))?;
        let count = (len / RECORD_LEN as u64) as usize;
        let mut records = Vec::with_capacity(count);
        let mut buf = [0u8; RECORD_LEN];
        for _ in 0..count {
            file.read_exact(&mut buf)?;
            records.push(UserRecord::decode(&buf)?);
        }
        Ok(records)
    }

    /// Looks up a user by name (spec invariant 4: at most one record per
    /// username, so the first match is the only match).
    pub fn find(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.into_iter().find(|u| u.username == username))
    }

    /// Registers a new user. Returns `Ok(false)` without writing anything
    /// if the username is already taken.
    pub fn register(&self, username: &str, password: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock();
        let existing = self.read_all()?;
        if existing.iter().any(|u| u.username == username) {
            return Ok(false);
        }

        let record = UserRecord {
            username: username.to_string(),
            password_hash: hash_password(password),
        };
        let bytes = record.encode()?;

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(true)
    }

    /// Verifies a login attempt: `Ok(Some(true))` on a match, `Ok(Some(false))`
    /// for a wrong password, `Ok(None)` if the username doesn't exist.
    pub fn verify_login(&self, username: &str, password: &str) -> StoreResult<Option<bool>> {
        let _guard = self.lock.lock();
        let Some(user) = self.read_all()?.into_iter().find(|u| u.username == username) else {
            return Ok(None);
        };
        Ok(Some(verify_password(password, &user.password_hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_login_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::open(dir.path().join("users.db")).unwrap();

        assert!(store.register("alice", "hunter2").unwrap());
        assert_eq!(store.verify_login("alice", "hunter2").unwrap(), Some(true));
        assert_eq!(store.verify_login("alice", "wrong").unwrap(), Some(false));
        assert_eq!(store.verify_login("bob", "anything").unwrap(), None);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::open(dir.path().join("users.db")).unwrap();

        assert!(store.register("alice", "hunter2").unwrap());
        assert!(!store.register("alice", "other").unwrap());
    }

    #[test]
    fn store_file_size_is_a_record_multiple() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        let store = UserStore::open(&path).unwrap();
        store.register("alice", "hunter2").unwrap();
        store.register("bob", "swordfish").unwrap();

        let len = fs::metadata(&path).unwrap().len();
        assert_eq!(len % RECORD_LEN as u64, 0);
        assert_eq!(len, 2 * RECORD_LEN as u64);
    }
}
