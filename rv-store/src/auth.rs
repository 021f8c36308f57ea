//! Password hashing (REDESIGN FLAG, SPEC_FULL.md §11.1). The original C
//! source stored passwords in plaintext; this crate never does. Passwords
//! are salted and hashed with SHA-256 before they ever touch disk — reusing
//! the same `sha2` dependency the content-hashing path already needs rather
//! than pulling in a second crypto crate.

use rand::RngCore;

const SALT_LEN: usize = 16;

/// Hashes `password` against a freshly generated random salt and returns
/// `hex(salt) ++ ':' ++ hex(sha256(salt || password))`, the form stored in
/// a [`crate::users::UserRecord`].
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    hash_with_salt(&salt, password)
}

/// Checks `password` against a digest previously produced by
/// [`hash_password`].
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, _)) = stored.split_once(':') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    hash_with_salt(&salt, password) == stored
}

fn hash_with_salt(salt: &[u8], password: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    format!("{}:{}", hex::encode(salt), hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_password_verifies() {
        let stored = hash_password("hunter2");
        assert!(verify_password("hunter2", &stored));
    }

    #[test]
    fn mismatched_password_is_rejected() {
        let stored = hash_password("hunter2");
        assert!(!verify_password("wrong", &stored));
    }

    #[test]
    fn two_hashes_of_same_password_differ_by_salt() {
        assert_ne!(hash_password("hunter2"), hash_password("hunter2"));
    }
}
