//! Encryption configuration.

use profpay_crypto::KdfParams;
use serde::{Deserialize, Serialize};

/// Configuration for the encryption subsystem.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Long-lived server-wide secret. Protects session tokens and the
    /// recovery copy of the Master Key, never operator data directly.
    pub server_secret: String,

    /// PBKDF2 cost for operator password derivation.
    pub kdf_params: KdfParams,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            server_secret: "change-this-secret-before-first-launch".to_string(),
            kdf_params: KdfParams::default(),
        }
    }
}

impl EncryptionConfig {
    /// Creates a config with a cheap KDF for tests.
    pub fn test() -> Self {
        Self {
            server_secret: "test-server-secret".to_string(),
            kdf_params: KdfParams::insecure_for_tests(),
        }
    }
}
