//! Storage layer: content-addressed blob store, the per-user version
//! ledger, and the user store, plus the pure `hash_file` helper both sides
//! of `ADD`/`GET` rely on.

pub mod auth;
pub mod blob;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod logging;
pub mod users;

pub use blob::BlobStore;
pub use error::{StoreError, StoreResult};
pub use hash::hash_file;
pub use ledger::{FileVersion, VersionLedger};
pub use users::UserStore;
