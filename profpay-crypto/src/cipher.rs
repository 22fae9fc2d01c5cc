//! Primitive authenticated cipher producing self-describing string tokens.
//!
//! A token is `pp1.` followed by base64url (no padding) of
//! `nonce ‖ ciphertext ‖ tag`, ChaCha20-Poly1305 with a random 12-byte
//! nonce per seal. The fixed marker lets the rest of the system tell
//! "already a ciphertext token" from "still plaintext" without attempting
//! decryption.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::KEY_SIZE;

/// Marker prefix of every ciphertext token. Version bump = new prefix.
pub const TOKEN_MARKER: &str = "pp1.";

/// ChaCha20-Poly1305 nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Whether a stored value is already a ciphertext token.
///
/// Used by the migration sweep to make re-runs a no-op, and by the field
/// codec to distinguish legacy plaintext from tampered ciphertext.
pub fn is_ciphertext(value: &str) -> bool {
    value.starts_with(TOKEN_MARKER)
}

/// Encrypts `plaintext` into a printable token under `key`.
///
/// The key parameter is raw bytes so the same primitive serves both the
/// Master Key (field encryption) and password-derived keys (key wrapping);
/// the typed wrappers live one layer up.
pub fn seal(plaintext: &[u8], key: &[u8; KEY_SIZE]) -> CryptoResult<String> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&ciphertext);

    Ok(format!("{TOKEN_MARKER}{}", URL_SAFE_NO_PAD.encode(payload)))
}

/// Decrypts a token produced by [`seal`].
///
/// Failure modes are kept distinguishable: a value without the marker is
/// `NotAToken`, a marked value that does not decode to a plausible payload
/// is `Malformed`, and a well-formed payload that fails Poly1305
/// verification (wrong key or altered bytes) is `Integrity`.
pub fn open(token: &str, key: &[u8; KEY_SIZE]) -> CryptoResult<Vec<u8>> {
    let encoded = token.strip_prefix(TOKEN_MARKER).ok_or(CryptoError::NotAToken)?;

    let payload = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CryptoError::Malformed(format!("base64: {e}")))?;

    if payload.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Malformed(format!(
            "payload too short: {} bytes",
            payload.len()
        )));
    }

    let (nonce_bytes, ciphertext) = payload.split_at(NONCE_SIZE);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::Integrity)
}
