//! Envelope encryption and transparent field cipher for ProfPay.
//!
//! Sensitive member and payment fields are stored as authenticated
//! ciphertext tokens and decrypted on read, while any number of operators
//! can reach the data through their own passwords.
//!
//! # Architecture
//!
//! Two-tier key scheme:
//!
//! 1. **Master Key**: a single random key protecting every sensitive field
//!    in the dataset. Minted once, at the first login after encryption is
//!    enabled; never stored unwrapped.
//!
//! 2. **User keys**: each operator's password is stretched (PBKDF2) into a
//!    personal key that wraps a copy of the Master Key. Unwrapping at
//!    login recovers the shared key without any operator ever holding an
//!    independent plaintext-protecting secret.
//!
//! This allows:
//! - Password changes without re-encrypting any data (re-wrap only)
//! - Enrolling new operators without re-keying the dataset
//! - Field tokens that authenticate themselves (tampering is detected,
//!   never decrypted into garbage)

mod cipher;
pub mod envelope;
mod error;
pub mod fields;
mod kdf;
mod money;
pub mod session;

pub use cipher::{is_ciphertext, open, seal, NONCE_SIZE, TAG_SIZE, TOKEN_MARKER};
pub use envelope::{
    enroll, recover_master_key, unwrap_master_key, wrap_master_key, UserKeyRecord,
};
pub use error::{CryptoError, CryptoResult};
pub use fields::{
    decode_date, decode_money, decode_text, encode_date, encode_money, encode_text, Decoded,
};
pub use kdf::{
    derive_server_key, derive_user_key, DerivedKey, KdfParams, MasterKey, Salt, KEY_SIZE,
    SALT_SIZE,
};
pub use money::{Money, ParseMoneyError};
pub use session::SessionSealer;
