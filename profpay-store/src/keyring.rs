//! Login orchestration and the enrollment state machine.
//!
//! One Master Key protects the whole dataset; every operator holds a
//! wrapped copy openable with their own password. The first login after
//! the scheme is activated mints the key, enrolls the triggering
//! operator, stores a server-held recovery copy, and sweeps legacy
//! plaintext in one transaction, so there is no reachable state with
//! encrypted rows but no durably wrapped key.
//!
//! The recovery copy (Master Key sealed under a key derived from the
//! server secret) is what lets operators created *before* activation
//! become enrolled at their next successful login, without a second key
//! ever being minted. The server secret already protects the Master Key
//! inside every session cookie, so this adds no new capability to a
//! secret-holding attacker.

use duckdb::{params, Connection};
use profpay_crypto::{
    derive_server_key, enroll, open, recover_master_key, seal, DerivedKey, KdfParams, MasterKey,
    KEY_SIZE, SALT_SIZE,
};
use tracing::{debug, info, warn};

use crate::accounts::{any_enrolled, fetch_operator, write_key_record, Operator};
use crate::config::EncryptionConfig;
use crate::error::{StoreError, StoreResult};
use crate::migration::{sweep_plaintext, MigrationReport};
use crate::{lock_db, Db};

/// Fixed domain salt for the recovery-copy key. Distinct from the
/// session-sealing salt so the two server-derived keys never coincide.
const RECOVERY_KDF_SALT: &[u8; SALT_SIZE] = b"profpay-rcvr-kdf";
const RECOVERY_KDF_ITERATIONS: u32 = 100_000;

/// `encryption_meta` key of the server-held recovery copy.
const RECOVERY_META_KEY: &str = "recovery_wrapped_key";

/// Result of a successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub master_key: MasterKey,
    /// Present only on the activation login that ran the one-shot sweep.
    pub migration: Option<MigrationReport>,
}

/// The enrollment state machine over the shared connection.
///
/// The caller (the authentication layer) must have verified the
/// operator's password *before* calling [`Keyring::login`]: for enrolled
/// operators the unwrap doubles as a check, but for unenrolled operators
/// enrollment trusts the password it is given.
pub struct Keyring {
    db: Db,
    recovery_key: DerivedKey,
    kdf_params: KdfParams,
}

impl Keyring {
    pub fn new(db: Db, config: &EncryptionConfig) -> Self {
        Self {
            db,
            recovery_key: derive_server_key(
                &config.server_secret,
                RECOVERY_KDF_SALT,
                RECOVERY_KDF_ITERATIONS,
            ),
            kdf_params: config.kdf_params.clone(),
        }
    }

    /// Whether a Master Key has been minted for this dataset.
    pub fn is_activated(&self) -> StoreResult<bool> {
        let conn = lock_db(&self.db)?;
        Ok(fetch_recovery_copy(&conn)?.is_some() || any_enrolled(&conn)?)
    }

    /// Recovers the Master Key for an operator's login.
    ///
    /// Enrolled operator: unwrap with the password-derived key; failure is
    /// `InvalidCredentials` with no further detail. Unenrolled operator:
    /// first-ever login mints and migrates; otherwise enrollment proceeds
    /// from the recovery copy.
    pub fn login(&self, username: &str, password: &str) -> StoreResult<LoginOutcome> {
        let conn = lock_db(&self.db)?;
        let operator = fetch_operator(&conn, username)?.ok_or(StoreError::InvalidCredentials)?;

        match &operator.key_record {
            Some(record) => {
                let master_key = recover_master_key(password, record, &self.kdf_params)
                    .ok_or(StoreError::InvalidCredentials)?;
                debug!(operator = %operator.username, "master key unwrapped");
                Ok(LoginOutcome {
                    master_key,
                    migration: None,
                })
            }
            None => self.enroll_operator(&conn, &operator, password),
        }
    }

    /// Re-wraps the same Master Key under a new password and fresh salt.
    ///
    /// For an operator still unenrolled on an activated dataset this
    /// doubles as enrollment: the password-change flow is the designated
    /// catch-up path when the recovery copy is somehow unavailable.
    pub fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> StoreResult<()> {
        let conn = lock_db(&self.db)?;
        let operator = fetch_operator(&conn, username)?.ok_or(StoreError::InvalidCredentials)?;

        let master_key = match &operator.key_record {
            Some(record) => recover_master_key(old_password, record, &self.kdf_params)
                .ok_or(StoreError::InvalidCredentials)?,
            None => self
                .open_recovery_copy(&conn)?
                .ok_or(StoreError::InvalidCredentials)?,
        };

        let record = enroll(&master_key, new_password, &self.kdf_params)?;
        write_key_record(&conn, operator.id, &record)?;
        info!(operator = %operator.username, "master key re-wrapped");
        Ok(())
    }

    /// Enrollment path for an operator with no key record.
    fn enroll_operator(
        &self,
        conn: &Connection,
        operator: &Operator,
        password: &str,
    ) -> StoreResult<LoginOutcome> {
        conn.execute_batch("BEGIN TRANSACTION")?;

        let result = self.enroll_operator_in_tx(conn, operator, password);
        match result {
            Ok(outcome) => {
                conn.execute_batch("COMMIT")?;
                Ok(outcome)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    fn enroll_operator_in_tx(
        &self,
        conn: &Connection,
        operator: &Operator,
        password: &str,
    ) -> StoreResult<LoginOutcome> {
        // Re-check under the transaction: another actor may have enrolled
        // this operator or activated the dataset since the first read.
        let current = fetch_operator(conn, &operator.username)?
            .ok_or(StoreError::InvalidCredentials)?;
        if current.is_enrolled() {
            return Err(StoreError::ConcurrentEnrollment);
        }

        if let Some(master_key) = self.open_recovery_copy(conn)? {
            // Activated dataset: enroll this operator from the recovery copy.
            let record = enroll(&master_key, password, &self.kdf_params)?;
            write_key_record(conn, operator.id, &record)?;
            info!(operator = %operator.username, "operator enrolled from recovery copy");
            return Ok(LoginOutcome {
                master_key,
                migration: None,
            });
        }

        if any_enrolled(conn)? {
            // A wrapped key exists but no recovery copy: enrollment of this
            // operator must wait for the password-change catch-up path.
            return Err(StoreError::Invariant(
                "dataset activated without a recovery copy".into(),
            ));
        }

        // First-ever login: mint, enroll, store the recovery copy, sweep.
        let master_key = MasterKey::generate();
        let record = enroll(&master_key, password, &self.kdf_params)?;
        write_key_record(conn, operator.id, &record)?;
        store_recovery_copy(conn, &seal_recovery_copy(&master_key, &self.recovery_key)?)?;

        let report = sweep_plaintext(conn, &master_key)?;
        info!(
            operator = %operator.username,
            fields = report.fields_encrypted,
            "master key minted, dataset migrated"
        );

        Ok(LoginOutcome {
            master_key,
            migration: Some(report),
        })
    }

    /// Re-runs the plaintext sweep as a repair path.
    ///
    /// Safe to trigger at any time: fields already in ciphertext are
    /// skipped, so on a healthy dataset this reports a no-op.
    pub fn resweep(&self, master_key: &MasterKey) -> StoreResult<MigrationReport> {
        let conn = lock_db(&self.db)?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        match sweep_plaintext(&conn, master_key) {
            Ok(report) => {
                conn.execute_batch("COMMIT")?;
                Ok(report)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    fn open_recovery_copy(&self, conn: &Connection) -> StoreResult<Option<MasterKey>> {
        let Some(token) = fetch_recovery_copy(conn)? else {
            return Ok(None);
        };
        let bytes = open(&token, self.recovery_key.as_bytes()).map_err(|e| {
            warn!("recovery copy failed to open: {e}");
            StoreError::Invariant("recovery copy failed integrity verification".into())
        })?;
        let key: [u8; KEY_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Invariant("recovery copy has wrong key length".into()))?;
        Ok(Some(MasterKey::from_bytes(key)))
    }
}

fn seal_recovery_copy(master_key: &MasterKey, recovery_key: &DerivedKey) -> StoreResult<String> {
    Ok(seal(master_key.as_bytes(), recovery_key.as_bytes())?)
}

fn fetch_recovery_copy(conn: &Connection) -> StoreResult<Option<String>> {
    match conn.query_row(
        "SELECT value FROM encryption_meta WHERE key = ?",
        params![RECOVERY_META_KEY],
        |row| row.get(0),
    ) {
        Ok(token) => Ok(Some(token)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn store_recovery_copy(conn: &Connection, token: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO encryption_meta (key, value) VALUES (?, ?)",
        params![RECOVERY_META_KEY, token],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountStore;
    use crate::open_in_memory;

    // The re-check guards against a second connection (or a stale snapshot)
    // enrolling an operator whose row gained a key record after the first
    // read. In-process the connection mutex already serializes logins, so
    // the branch is driven directly here with an outdated snapshot.
    #[test]
    fn stale_operator_snapshot_loses_the_enrollment_race() {
        let db = open_in_memory().unwrap();
        let stale = AccountStore::new(db.clone())
            .create_operator("alice")
            .unwrap();

        let ring = Keyring::new(db.clone(), &EncryptionConfig::test());
        ring.login("alice", "alice-pw").unwrap();

        let conn = lock_db(&db).unwrap();
        let err = ring
            .enroll_operator_in_tx(&conn, &stale, "alice-pw")
            .unwrap_err();
        assert!(matches!(err, StoreError::ConcurrentEnrollment));
    }
}
