//! Table creation.
//!
//! Encryptable columns are plain VARCHAR wide enough for ciphertext
//! tokens; a pre-encryption dataset simply holds plaintext in the same
//! columns until the one-shot migration rewrites them in place.

use duckdb::Connection;

use crate::error::StoreResult;

pub(crate) fn initialize_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS operators (
            id BIGINT PRIMARY KEY,
            username VARCHAR NOT NULL UNIQUE,
            -- Envelope columns: both set (enrolled) or both NULL (unenrolled)
            wrapped_master_key VARCHAR,
            key_salt BLOB
        );

        CREATE TABLE IF NOT EXISTS payers (
            id BIGINT PRIMARY KEY,
            last_name VARCHAR NOT NULL,
            first_name VARCHAR NOT NULL,
            email VARCHAR,
            phone VARCHAR,
            telegram VARCHAR,
            date_of_birth VARCHAR,
            stipend_amount VARCHAR
        );

        CREATE TABLE IF NOT EXISTS payments (
            id BIGINT PRIMARY KEY,
            payer_id BIGINT NOT NULL,
            payment_date VARCHAR NOT NULL,
            amount VARCHAR NOT NULL,
            receipt_number VARCHAR
        );

        CREATE TABLE IF NOT EXISTS encryption_meta (
            key VARCHAR PRIMARY KEY,
            value VARCHAR NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Next id for a table, computed under the connection mutex. DuckDB has no
/// autoincrement; single-writer access makes MAX+1 safe here.
pub(crate) fn next_id(conn: &Connection, table: &str) -> StoreResult<i64> {
    let id: i64 = conn.query_row(
        &format!("SELECT COALESCE(MAX(id), 0) + 1 FROM {table}"),
        [],
        |row| row.get(0),
    )?;
    Ok(id)
}
