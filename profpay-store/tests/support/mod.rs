//! Shared helpers for store integration tests.
#![allow(dead_code)] // each test binary uses its own subset

use profpay_store::{AccountStore, Db, EncryptionConfig, Keyring};

pub fn open_db() -> Db {
    profpay_store::open_in_memory().expect("in-memory database")
}

pub fn keyring(db: &Db) -> Keyring {
    Keyring::new(db.clone(), &EncryptionConfig::test())
}

pub fn create_operator(db: &Db, username: &str) {
    AccountStore::new(db.clone())
        .create_operator(username)
        .expect("create operator");
}

/// Seeds a legacy plaintext payer row, bypassing the codec: the state a
/// pre-encryption deployment leaves behind.
pub fn seed_plaintext_payer(
    db: &Db,
    id: i64,
    last_name: &str,
    phone: &str,
    date_of_birth: &str,
    stipend: &str,
) {
    let conn = db.lock().unwrap();
    conn.execute(
        "INSERT INTO payers
             (id, last_name, first_name, email, phone, telegram, date_of_birth, stipend_amount)
         VALUES (?, ?, 'Test', NULL, ?, NULL, ?, ?)",
        duckdb::params![id, last_name, phone, date_of_birth, stipend],
    )
    .expect("seed payer");
}

/// Reads a raw column value straight from the payers table.
pub fn raw_payer_column(db: &Db, id: i64, column: &str) -> Option<String> {
    let conn = db.lock().unwrap();
    conn.query_row(
        &format!("SELECT {column} FROM payers WHERE id = ?"),
        duckdb::params![id],
        |row| row.get(0),
    )
    .expect("raw column read")
}
