//! Operator account rows and the enrolled/unenrolled invariant.

use duckdb::{params, Connection};
use profpay_crypto::{Salt, UserKeyRecord, SALT_SIZE};

use crate::error::{StoreError, StoreResult};
use crate::{lock_db, schema, Db};

/// A system operator account, as this core sees it. Authentication
/// attributes (password hash, role, activity flag) belong to the excluded
/// CRUD layer.
#[derive(Clone, Debug)]
pub struct Operator {
    pub id: i64,
    pub username: String,
    /// Present iff the operator is enrolled.
    pub key_record: Option<UserKeyRecord>,
}

impl Operator {
    pub fn is_enrolled(&self) -> bool {
        self.key_record.is_some()
    }
}

/// Public surface over operator rows.
pub struct AccountStore {
    db: Db,
}

impl AccountStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Creates an unenrolled operator account.
    pub fn create_operator(&self, username: &str) -> StoreResult<Operator> {
        let conn = lock_db(&self.db)?;
        if fetch_operator(&conn, username)?.is_some() {
            return Err(StoreError::OperatorExists(username.to_string()));
        }
        let id = schema::next_id(&conn, "operators")?;
        conn.execute(
            "INSERT INTO operators (id, username) VALUES (?, ?)",
            params![id, username],
        )?;
        Ok(Operator {
            id,
            username: username.to_string(),
            key_record: None,
        })
    }

    pub fn get_operator(&self, username: &str) -> StoreResult<Option<Operator>> {
        let conn = lock_db(&self.db)?;
        fetch_operator(&conn, username)
    }
}

/// Reads an operator row, enforcing the both-or-neither envelope invariant.
pub(crate) fn fetch_operator(conn: &Connection, username: &str) -> StoreResult<Option<Operator>> {
    type OperatorRow = (i64, String, Option<String>, Option<Vec<u8>>);
    let row: OperatorRow = match conn.query_row(
        "SELECT id, username, wrapped_master_key, key_salt
         FROM operators WHERE username = ?",
        params![username],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    ) {
        Ok(row) => row,
        Err(duckdb::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let (id, username, wrapped, salt) = row;

    let key_record = match (wrapped, salt) {
        (None, None) => None,
        (Some(wrapped_master_key), Some(salt_bytes)) => {
            let salt: [u8; SALT_SIZE] = salt_bytes.as_slice().try_into().map_err(|_| {
                StoreError::Invariant(format!(
                    "operator {username}: key salt has {} bytes, expected {SALT_SIZE}",
                    salt_bytes.len()
                ))
            })?;
            Some(UserKeyRecord {
                wrapped_master_key,
                key_salt: Salt::from_bytes(salt),
            })
        }
        _ => {
            return Err(StoreError::Invariant(format!(
                "operator {username}: wrapped key and salt must both be set or both be absent"
            )));
        }
    };

    Ok(Some(Operator {
        id,
        username,
        key_record,
    }))
}

/// Writes (or replaces) an operator's envelope columns. Used at
/// enrollment and on password change.
pub(crate) fn write_key_record(
    conn: &Connection,
    operator_id: i64,
    record: &UserKeyRecord,
) -> StoreResult<()> {
    let updated = conn.execute(
        "UPDATE operators SET wrapped_master_key = ?, key_salt = ? WHERE id = ?",
        params![
            record.wrapped_master_key,
            record.key_salt.as_bytes().to_vec(),
            operator_id
        ],
    )?;
    if updated == 0 {
        return Err(StoreError::Invariant(format!(
            "no operator row with id {operator_id}"
        )));
    }
    Ok(())
}

/// Whether any operator holds a wrapped Master Key.
pub(crate) fn any_enrolled(conn: &Connection) -> StoreResult<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM operators WHERE wrapped_master_key IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}
