//! Session custody of a recovered Master Key.
//!
//! After login the Master Key must survive the rest of the operator's
//! session without the password being re-entered and without landing in
//! server-side storage. It is sealed under a key derived once from the
//! long-lived server secret and handed to the client as an opaque
//! cookie value; each request unseals it back for local use only.
//!
//! Limitation: there is no server-side session table, so a stolen token
//! cannot be revoked before its cookie expires; logout is client-side
//! deletion.

use crate::cipher::{open, seal};
use crate::error::CryptoResult;
use crate::kdf::{derive_server_key, DerivedKey, MasterKey, KEY_SIZE, SALT_SIZE};

/// Fixed domain salt for the session-sealing key. Non-secret; the KDF
/// input (the server secret) is what carries the entropy here.
const SESSION_KDF_SALT: &[u8; SALT_SIZE] = b"profpay-sess-kdf";

/// Iterations for the server-secret KDF. Far below the password cost on
/// purpose: the input is high-entropy, and this runs on every request.
const SESSION_KDF_ITERATIONS: u32 = 100_000;

/// Seals and unseals Master Keys for cookie transport.
///
/// Derive once at startup and share; the expensive KDF runs a single time.
pub struct SessionSealer {
    key: DerivedKey,
}

impl SessionSealer {
    pub fn new(server_secret: &str) -> Self {
        Self {
            key: derive_server_key(server_secret, SESSION_KDF_SALT, SESSION_KDF_ITERATIONS),
        }
    }

    /// Seals a Master Key into an opaque session token.
    pub fn seal(&self, master_key: &MasterKey) -> CryptoResult<String> {
        seal(master_key.as_bytes(), self.key.as_bytes())
    }

    /// Recovers a Master Key from a session token.
    ///
    /// Any failure (tampered cookie, token from a different deployment)
    /// collapses to `None`; the caller treats it as an expired session.
    pub fn open(&self, token: &str) -> Option<MasterKey> {
        let bytes = open(token, self.key.as_bytes()).ok()?;
        if bytes.len() != KEY_SIZE {
            return None;
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes);
        Some(MasterKey::from_bytes(key))
    }
}
