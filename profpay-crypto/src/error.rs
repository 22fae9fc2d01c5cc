//! Error types for the crypto crate.

use thiserror::Error;

/// All errors that can occur in cipher and codec operations.
///
/// `NotAToken`, `Malformed` and `Integrity` are deliberately separate:
/// a value without the token marker is legacy plaintext, a marked token
/// that fails authentication is tampering or corruption, and the two must
/// never be confused.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("value does not carry the encryption token marker")]
    NotAToken,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token failed integrity verification (wrong key or tampered data)")]
    Integrity,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decrypted payload is not a valid {expected}: {detail}")]
    Encoding {
        expected: &'static str,
        detail: String,
    },
}

pub type CryptoResult<T> = Result<T, CryptoError>;
