//! DuckDB-backed records store for ProfPay's encryption core.
//!
//! Holds operator accounts (with their wrapped Master Key columns), payer
//! and payment rows whose sensitive fields are ciphertext tokens, and the
//! orchestration that turns a login into a recovered Master Key.
//!
//! # Architecture
//!
//! - Entities cross a single codec boundary (`codec`) on every read and
//!   write; no call site encrypts fields ad hoc
//! - `Keyring` owns the enrollment state machine and the one-shot
//!   plaintext migration, both inside one transaction
//! - The Master Key is only ever passed as an argument; nothing in this
//!   crate stores it between requests

mod accounts;
pub mod codec;
mod config;
mod error;
mod keyring;
mod migration;
mod payers;
mod schema;

pub use accounts::{AccountStore, Operator};
pub use config::EncryptionConfig;
pub use error::{StoreError, StoreResult};
pub use keyring::{Keyring, LoginOutcome};
pub use migration::MigrationReport;
pub use payers::{NewPayer, NewPayment, Payer, PayerStore, Payment};

use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared database handle. One writer at a time, enforced by the mutex.
pub type Db = Arc<Mutex<duckdb::Connection>>;

/// Opens the database with stale WAL recovery and resource limits, and
/// creates the schema.
///
/// If the initial open fails and a `.wal` file exists alongside the
/// database, it is removed and the open retried once; an unclean
/// shutdown can leave a WAL file that prevents reopening. Memory and
/// thread pragmas cap DuckDB's per-connection appetite (defaults are ~80%
/// of system RAM and every core).
pub fn open_database(path: &Path) -> StoreResult<Db> {
    let conn = match duckdb::Connection::open(path) {
        Ok(c) => c,
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() {
                tracing::warn!(
                    "database open failed, removing stale WAL and retrying: {}",
                    wal_path.display()
                );
                if std::fs::remove_file(&wal_path).is_ok() {
                    let c = duckdb::Connection::open(path)?;
                    return finish_open(c);
                }
            }
            return Err(first_err.into());
        }
    };
    finish_open(conn)
}

/// Opens an in-memory database (for testing).
pub fn open_in_memory() -> StoreResult<Db> {
    let conn = duckdb::Connection::open_in_memory()?;
    schema::initialize_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn finish_open(conn: duckdb::Connection) -> StoreResult<Db> {
    conn.execute_batch("PRAGMA memory_limit='256MB'; PRAGMA threads=2;")?;
    schema::initialize_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Locks the shared connection, mapping a poisoned mutex to an invariant
/// error instead of panicking in library code.
pub(crate) fn lock_db(db: &Db) -> StoreResult<std::sync::MutexGuard<'_, duckdb::Connection>> {
    db.lock()
        .map_err(|e| StoreError::Invariant(format!("connection mutex poisoned: {e}")))
}
