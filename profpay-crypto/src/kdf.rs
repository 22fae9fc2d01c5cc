//! Password key derivation and key material types.
//!
//! Operator passwords are stretched into cipher-grade keys with
//! PBKDF2-HMAC-SHA256 and a per-operator random salt. The iteration count
//! lives in [`KdfParams`] so the cost can be raised without touching call
//! sites (existing wrapped keys record nothing; a re-wrap on password
//! change picks up the new cost automatically).

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of every symmetric key in the scheme (ChaCha20-Poly1305).
pub const KEY_SIZE: usize = 32;

/// Size of a per-operator KDF salt.
pub const SALT_SIZE: usize = 16;

/// PBKDF2 cost parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KdfParams {
    /// PBKDF2-HMAC-SHA256 iteration count.
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self { iterations: 480_000 }
    }
}

impl KdfParams {
    /// Cheap parameters for tests. Never use outside test code.
    pub fn insecure_for_tests() -> Self {
        Self { iterations: 16 }
    }
}

/// A random, non-secret KDF salt. One per operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// A key derived from an operator password. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// The single dataset-wide key protecting every sensitive field.
///
/// Exists only in request-local memory and inside per-operator wrapped
/// copies; never persisted unwrapped. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    /// Mints a fresh random Master Key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl PartialEq for MasterKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl std::fmt::Debug for MasterKey {
    /// Key bytes never reach logs or panic output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Derives an operator's personal key from their password and salt.
///
/// Deterministic and infallible: a password is never rejected here, only
/// by the unwrap step that consumes the result.
pub fn derive_user_key(password: &str, salt: &Salt, params: &KdfParams) -> DerivedKey {
    let mut out = [0u8; KEY_SIZE];
    pbkdf2_hmac::<sha2::Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        params.iterations,
        &mut out,
    );
    DerivedKey(out)
}

/// Derives a server-side key from the long-lived server secret.
///
/// The salt here is fixed and non-secret, acceptable because the input is
/// itself a high-entropy secret, unlike an operator password. Distinct
/// fixed salts separate the session-sealing and recovery-wrap domains.
pub fn derive_server_key(secret: &str, domain_salt: &[u8; SALT_SIZE], iterations: u32) -> DerivedKey {
    let mut out = [0u8; KEY_SIZE];
    pbkdf2_hmac::<sha2::Sha256>(secret.as_bytes(), domain_salt, iterations, &mut out);
    DerivedKey(out)
}
