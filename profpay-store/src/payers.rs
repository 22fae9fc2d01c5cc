//! Payer and payment persistence.
//!
//! All reads and writes route through the codec boundary in [`crate::codec`];
//! nothing here touches the cipher directly.

use chrono::NaiveDate;
use duckdb::params;
use profpay_crypto::{MasterKey, Money};
use serde::{Deserialize, Serialize};

use crate::codec::{decode_payer, decode_payment, encode_payer, encode_payment, StoredPayer, StoredPayment};
use crate::error::{StoreError, StoreResult};
use crate::{lock_db, schema, Db};

/// A trade-union payer with its sensitive fields in plaintext form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub telegram: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub stipend_amount: Option<Money>,
}

/// Input for creating a payer; the store assigns the id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewPayer {
    pub last_name: String,
    pub first_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub telegram: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub stipend_amount: Option<Money>,
}

/// A dues payment with its amount in plaintext form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub payer_id: i64,
    pub payment_date: NaiveDate,
    pub amount: Money,
    pub receipt_number: Option<String>,
}

/// Input for recording a payment; the store assigns the id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewPayment {
    pub payer_id: i64,
    pub payment_date: NaiveDate,
    pub amount: Money,
    pub receipt_number: Option<String>,
}

/// Payer/payment persistence over the shared connection.
pub struct PayerStore {
    db: Db,
}

impl PayerStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Inserts a payer, sealing its sensitive fields under `key`.
    pub fn create_payer(&self, new: &NewPayer, key: &MasterKey) -> StoreResult<Payer> {
        let conn = lock_db(&self.db)?;
        let payer = Payer {
            id: schema::next_id(&conn, "payers")?,
            last_name: new.last_name.clone(),
            first_name: new.first_name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            telegram: new.telegram.clone(),
            date_of_birth: new.date_of_birth,
            stipend_amount: new.stipend_amount,
        };
        let stored = encode_payer(&payer, key)?;
        conn.execute(
            "INSERT INTO payers
                 (id, last_name, first_name, email, phone, telegram, date_of_birth, stipend_amount)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                stored.id,
                stored.last_name,
                stored.first_name,
                stored.email,
                stored.phone,
                stored.telegram,
                stored.date_of_birth,
                stored.stipend_amount,
            ],
        )?;
        Ok(payer)
    }

    /// Rewrites a payer row, re-sealing every sensitive field.
    pub fn update_payer(&self, payer: &Payer, key: &MasterKey) -> StoreResult<()> {
        let conn = lock_db(&self.db)?;
        let stored = encode_payer(payer, key)?;
        let updated = conn.execute(
            "UPDATE payers SET last_name = ?, first_name = ?, email = ?, phone = ?,
                 telegram = ?, date_of_birth = ?, stipend_amount = ?
             WHERE id = ?",
            params![
                stored.last_name,
                stored.first_name,
                stored.email,
                stored.phone,
                stored.telegram,
                stored.date_of_birth,
                stored.stipend_amount,
                stored.id,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::PayerNotFound(payer.id));
        }
        Ok(())
    }

    /// Fetches and decrypts a payer.
    pub fn get_payer(&self, id: i64, key: &MasterKey) -> StoreResult<Option<Payer>> {
        let conn = lock_db(&self.db)?;
        let stored = match conn.query_row(
            "SELECT id, last_name, first_name, email, phone, telegram,
                    date_of_birth, stipend_amount
             FROM payers WHERE id = ?",
            params![id],
            payer_row,
        ) {
            Ok(row) => row,
            Err(duckdb::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(decode_payer(&stored, key)?))
    }

    /// Lists all payers, decrypted, ordered by name.
    pub fn list_payers(&self, key: &MasterKey) -> StoreResult<Vec<Payer>> {
        let conn = lock_db(&self.db)?;
        let mut stmt = conn.prepare(
            "SELECT id, last_name, first_name, email, phone, telegram,
                    date_of_birth, stipend_amount
             FROM payers ORDER BY last_name, first_name",
        )?;
        let stored: Vec<StoredPayer> = stmt
            .query_map([], payer_row)?
            .collect::<Result<_, _>>()?;
        stored.iter().map(|s| decode_payer(s, key)).collect()
    }

    /// Records a payment, sealing the amount under `key`.
    pub fn record_payment(&self, new: &NewPayment, key: &MasterKey) -> StoreResult<Payment> {
        let conn = lock_db(&self.db)?;
        let payment = Payment {
            id: schema::next_id(&conn, "payments")?,
            payer_id: new.payer_id,
            payment_date: new.payment_date,
            amount: new.amount,
            receipt_number: new.receipt_number.clone(),
        };
        let stored = encode_payment(&payment, key)?;
        conn.execute(
            "INSERT INTO payments (id, payer_id, payment_date, amount, receipt_number)
             VALUES (?, ?, ?, ?, ?)",
            params![
                stored.id,
                stored.payer_id,
                stored.payment_date,
                stored.amount,
                stored.receipt_number,
            ],
        )?;
        Ok(payment)
    }

    /// Lists a payer's payments, decrypted, newest first.
    pub fn payments_for(&self, payer_id: i64, key: &MasterKey) -> StoreResult<Vec<Payment>> {
        let conn = lock_db(&self.db)?;
        let mut stmt = conn.prepare(
            "SELECT id, payer_id, payment_date, amount, receipt_number
             FROM payments WHERE payer_id = ? ORDER BY payment_date DESC",
        )?;
        let stored: Vec<StoredPayment> = stmt
            .query_map(params![payer_id], payment_row)?
            .collect::<Result<_, _>>()?;
        stored.iter().map(|s| decode_payment(s, key)).collect()
    }
}

fn payer_row(row: &duckdb::Row<'_>) -> duckdb::Result<StoredPayer> {
    Ok(StoredPayer {
        id: row.get(0)?,
        last_name: row.get(1)?,
        first_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        telegram: row.get(5)?,
        date_of_birth: row.get(6)?,
        stipend_amount: row.get(7)?,
    })
}

fn payment_row(row: &duckdb::Row<'_>) -> duckdb::Result<StoredPayment> {
    Ok(StoredPayment {
        id: row.get(0)?,
        payer_id: row.get(1)?,
        payment_date: row.get(2)?,
        amount: row.get(3)?,
        receipt_number: row.get(4)?,
    })
}
