//! Error types for the store crate.

use thiserror::Error;

/// All errors that can occur in store and key-orchestration operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] profpay_crypto::CryptoError),

    /// Wrong password, unknown account, or a wrapped key that failed to
    /// open. A single variant, so nothing distinguishes "account doesn't
    /// exist" from "wrong password" at the surface.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("operator not found: {0}")]
    OperatorNotFound(String),

    #[error("operator already exists: {0}")]
    OperatorExists(String),

    #[error("payer not found: {0}")]
    PayerNotFound(i64),

    /// A concurrent first login minted the Master Key while this one was
    /// in flight. The caller retries the login, which then takes the
    /// normal enrollment path.
    #[error("concurrent enrollment minted the master key first")]
    ConcurrentEnrollment,

    /// A persisted record violates a structural invariant (half-present
    /// key record, wrong salt length, missing recovery row). Not caused
    /// by user input; surfaced for operators to investigate.
    #[error("storage invariant violated: {0}")]
    Invariant(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
