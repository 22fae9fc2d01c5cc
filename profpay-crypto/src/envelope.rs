//! Master Key envelope: per-operator wrapped copies of the one dataset key.
//!
//! Every enrolled operator holds the same Master Key sealed under a key
//! derived from their own password. Unwrapping with the wrong password is
//! indistinguishable from a corrupted record: both collapse to `None`, and
//! callers surface it as "invalid credentials" without further detail.

use crate::cipher::{open, seal};
use crate::error::CryptoResult;
use crate::kdf::{derive_user_key, DerivedKey, KdfParams, MasterKey, Salt, KEY_SIZE};

/// The envelope columns stored on an operator account row.
///
/// Invariant: an operator either has a complete record (enrolled) or none
/// at all (unenrolled). The store layer never persists one half.
#[derive(Clone, Debug)]
pub struct UserKeyRecord {
    /// Master Key sealed under the operator's password-derived key.
    pub wrapped_master_key: String,
    /// Salt for deriving that key from the password.
    pub key_salt: Salt,
}

/// Seals the Master Key under an operator's derived key.
pub fn wrap_master_key(master_key: &MasterKey, user_key: &DerivedKey) -> CryptoResult<String> {
    seal(master_key.as_bytes(), user_key.as_bytes())
}

/// Opens a wrapped Master Key with an operator's derived key.
///
/// Every failure (wrong password, tampered or truncated record) collapses
/// to `None` so nothing about the cause leaks to the caller.
pub fn unwrap_master_key(wrapped: &str, user_key: &DerivedKey) -> Option<MasterKey> {
    let bytes = open(wrapped, user_key.as_bytes()).ok()?;
    if bytes.len() != KEY_SIZE {
        return None;
    }
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&bytes);
    Some(MasterKey::from_bytes(key))
}

/// Builds a fresh enrollment record for an operator: new salt, derive,
/// wrap. Used both at first enrollment and on password change; the
/// Master Key itself is never replaced, only its wrapping.
pub fn enroll(
    master_key: &MasterKey,
    password: &str,
    params: &KdfParams,
) -> CryptoResult<UserKeyRecord> {
    let key_salt = Salt::random();
    let user_key = derive_user_key(password, &key_salt, params);
    let wrapped_master_key = wrap_master_key(master_key, &user_key)?;
    Ok(UserKeyRecord {
        wrapped_master_key,
        key_salt,
    })
}

/// Recovers the Master Key from an operator's record and password.
pub fn recover_master_key(
    password: &str,
    record: &UserKeyRecord,
    params: &KdfParams,
) -> Option<MasterKey> {
    let user_key = derive_user_key(password, &record.key_salt, params);
    unwrap_master_key(&record.wrapped_master_key, &user_key)
}
