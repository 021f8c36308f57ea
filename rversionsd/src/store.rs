//! Ties the three storage components together and performs the
//! create-if-missing bootstrap spec.md §4.5 requires on startup.

use rv_store::{BlobStore, StoreResult, UserStore, VersionLedger};
use std::path::PathBuf;

pub struct Stores {
    pub blobs: BlobStore,
    pub users: UserStore,
    pub ledger: VersionLedger,
}

impl Stores {
    /// Ensures `root` and `root/users.db` exist (create-if-missing, 0755 on
    /// POSIX) and opens all three stores under it. Blobs live directly at
    /// `root/<hex-hash>` (spec.md §6), not in a subdirectory.
    pub fn bootstrap(root: impl Into<PathBuf>) -> StoreResult<Stores> {
        let root = root.into();
        let blobs = BlobStore::open(&root)?;
        let users = UserStore::open(root.join("users.db"))?;
        let ledger = VersionLedger::open(&root)?;
        Ok(Stores { blobs, users, ledger })
    }
}
