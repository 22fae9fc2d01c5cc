//! One-shot plaintext-to-ciphertext migration.
//!
//! Runs inside the caller's transaction (the same one that mints the
//! Master Key and enrolls the first operator), so a failure anywhere
//! rolls the whole activation back; a half-migrated dataset is never
//! reachable.
//!
//! Idempotent by construction: fields already carrying the token marker
//! are skipped, so re-triggering the sweep rewrites nothing.

use duckdb::{params, Connection};
use profpay_crypto::{
    encode_date, encode_money, encode_text, is_ciphertext, CryptoError, MasterKey, Money,
};
use serde::Serialize;
use tracing::info;

use crate::error::StoreResult;

/// What a migration sweep touched. Returned to the caller for the admin
/// surface and logged.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct MigrationReport {
    pub payers_scanned: usize,
    pub payments_scanned: usize,
    pub fields_encrypted: usize,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.fields_encrypted == 0
    }
}

/// Sweeps every payer and payment row, sealing fields still in plaintext.
///
/// An unparsable legacy value (a stipend that is not a decimal, a birth
/// date that is not ISO) aborts the sweep with an encoding error rather
/// than being skipped or sealed as garbage; the enclosing transaction
/// rolls back and the dataset stays untouched for repair.
pub(crate) fn sweep_plaintext(conn: &Connection, key: &MasterKey) -> StoreResult<MigrationReport> {
    let mut report = MigrationReport::default();

    report.payers_scanned = sweep_payers(conn, key, &mut report.fields_encrypted)?;
    report.payments_scanned = sweep_payments(conn, key, &mut report.fields_encrypted)?;

    info!(
        payers = report.payers_scanned,
        payments = report.payments_scanned,
        fields = report.fields_encrypted,
        "plaintext sweep complete"
    );
    Ok(report)
}

fn sweep_payers(
    conn: &Connection,
    key: &MasterKey,
    fields_encrypted: &mut usize,
) -> StoreResult<usize> {
    type Row = (i64, Option<String>, Option<String>, Option<String>, Option<String>, Option<String>);
    let mut stmt = conn.prepare(
        "SELECT id, email, phone, telegram, date_of_birth, stipend_amount FROM payers",
    )?;
    let rows: Vec<Row> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?
        .collect::<Result<_, _>>()?;

    let scanned = rows.len();
    for (id, email, phone, telegram, dob, stipend) in rows {
        let email = seal_text_in_place(email, key, fields_encrypted)?;
        let phone = seal_text_in_place(phone, key, fields_encrypted)?;
        let telegram = seal_text_in_place(telegram, key, fields_encrypted)?;
        let dob = seal_date_in_place(dob, key, fields_encrypted)?;
        let stipend = seal_money_in_place(stipend, key, fields_encrypted)?;

        conn.execute(
            "UPDATE payers SET email = ?, phone = ?, telegram = ?,
                 date_of_birth = ?, stipend_amount = ?
             WHERE id = ?",
            params![email, phone, telegram, dob, stipend, id],
        )?;
    }
    Ok(scanned)
}

fn sweep_payments(
    conn: &Connection,
    key: &MasterKey,
    fields_encrypted: &mut usize,
) -> StoreResult<usize> {
    type Row = (i64, String, Option<String>);
    let mut stmt = conn.prepare("SELECT id, amount, receipt_number FROM payments")?;
    let rows: Vec<Row> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<_, _>>()?;

    let scanned = rows.len();
    for (id, amount, receipt) in rows {
        let amount = seal_money_in_place(Some(amount), key, fields_encrypted)?;
        let receipt = seal_text_in_place(receipt, key, fields_encrypted)?;

        conn.execute(
            "UPDATE payments SET amount = ?, receipt_number = ? WHERE id = ?",
            params![amount, receipt, id],
        )?;
    }
    Ok(scanned)
}

fn seal_text_in_place(
    value: Option<String>,
    key: &MasterKey,
    count: &mut usize,
) -> StoreResult<Option<String>> {
    match value {
        Some(v) if !is_ciphertext(&v) => {
            *count += 1;
            Ok(encode_text(Some(&v), key)?)
        }
        other => Ok(other),
    }
}

fn seal_date_in_place(
    value: Option<String>,
    key: &MasterKey,
    count: &mut usize,
) -> StoreResult<Option<String>> {
    match value {
        Some(v) if !is_ciphertext(&v) => {
            let date = chrono::NaiveDate::parse_from_str(&v, "%Y-%m-%d").map_err(|e| {
                CryptoError::Encoding {
                    expected: "ISO-8601 date",
                    detail: e.to_string(),
                }
            })?;
            *count += 1;
            Ok(encode_date(Some(date), key)?)
        }
        other => Ok(other),
    }
}

fn seal_money_in_place(
    value: Option<String>,
    key: &MasterKey,
    count: &mut usize,
) -> StoreResult<Option<String>> {
    match value {
        Some(v) if !is_ciphertext(&v) => {
            let amount: Money = v.parse().map_err(|e: profpay_crypto::ParseMoneyError| {
                CryptoError::Encoding {
                    expected: "decimal amount",
                    detail: e.to_string(),
                }
            })?;
            *count += 1;
            Ok(encode_money(Some(amount), key)?)
        }
        other => Ok(other),
    }
}
