//! Field-width constants shared by both sides of the wire.
//!
//! Mirrors the C source's `PATH_MAX`/`HASH_SIZE`/`COMMENT_SIZE` macros; kept
//! as named constants here instead of magic numbers scattered through the
//! framing code.

/// Max filename length, modeled on POSIX `PATH_MAX - 1` (no NUL terminator
/// on the wire, since strings are length-prefixed rather than C strings).
pub const FILENAME_MAX: usize = 4095;

/// Max comment length (`COMMENT_SIZE - 1` in the original, which reserved a
/// byte for the NUL terminator we don't need).
pub const COMMENT_MAX: usize = 79;

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// On-wire fixed width of the hash field (`HASH_SIZE` in the original,
/// padded with zero bytes past the 64 hex characters).
pub const HASH_FIELD_LEN: usize = 256;

/// Fixed width of the `username`/`password` fields in a login/register
/// payload.
pub const CREDENTIAL_FIELD_LEN: usize = 64;

/// Fixed width of the filename filter buffer used by `LIST` (kept
/// fixed-width, unlike the length-prefixed strings used elsewhere, to
/// preserve the asymmetry spec.md calls out as a deliberate wire quirk).
pub const LIST_FILTER_FIELD_LEN: usize = 80;

/// Sector size the ledger record length is aligned/padded to (spec.md §3):
/// every ledger file's length must be a multiple of this value so reads can
/// stay sector-aligned.
pub const LEDGER_SECTOR_LEN: usize = 512;

/// Size, in bytes, of one on-disk `FileVersion` ledger record. Chosen as
/// the smallest multiple of [`LEDGER_SECTOR_LEN`] that fits a length-
/// prefixed `FILENAME_MAX`-byte filename alongside the hash and comment
/// fields (the original C struct is `__attribute__((aligned(512)))`, which
/// rounds the struct's *size* up to a 512-byte multiple rather than
/// shrinking it to exactly 512 bytes — this keeps the same property).
pub const LEDGER_RECORD_LEN: usize = 4608;
