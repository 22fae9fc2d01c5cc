//! The entity codec boundary.
//!
//! Every payer and payment crosses these functions between its in-memory
//! plaintext form and its stored token form. Name fields stay plaintext
//! (they back search and sorting); contact details, birth dates and
//! amounts are sealed.
//!
//! Decoding accepts legacy plaintext values (rows the one-shot migration
//! has not rewritten yet; the field layer has already logged them), but
//! a marked token that fails authentication propagates as an error.

use chrono::NaiveDate;
use profpay_crypto::{
    decode_date, decode_money, decode_text, encode_date, encode_money, encode_text, CryptoError,
    MasterKey,
};

use crate::error::{StoreError, StoreResult};
use crate::payers::{Payer, Payment};

/// A payer row as persisted: sensitive columns hold tokens (or legacy
/// plaintext on a pre-migration dataset).
#[derive(Clone, Debug)]
pub struct StoredPayer {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub telegram: Option<String>,
    pub date_of_birth: Option<String>,
    pub stipend_amount: Option<String>,
}

/// A payment row as persisted.
#[derive(Clone, Debug)]
pub struct StoredPayment {
    pub id: i64,
    pub payer_id: i64,
    pub payment_date: String,
    pub amount: String,
    pub receipt_number: Option<String>,
}

/// Seals a payer's sensitive fields for storage.
pub fn encode_payer(payer: &Payer, key: &MasterKey) -> StoreResult<StoredPayer> {
    Ok(StoredPayer {
        id: payer.id,
        last_name: payer.last_name.clone(),
        first_name: payer.first_name.clone(),
        email: encode_text(payer.email.as_deref(), key)?,
        phone: encode_text(payer.phone.as_deref(), key)?,
        telegram: encode_text(payer.telegram.as_deref(), key)?,
        date_of_birth: encode_date(payer.date_of_birth, key)?,
        stipend_amount: encode_money(payer.stipend_amount, key)?,
    })
}

/// Opens a stored payer back into its plaintext form.
pub fn decode_payer(stored: &StoredPayer, key: &MasterKey) -> StoreResult<Payer> {
    Ok(Payer {
        id: stored.id,
        last_name: stored.last_name.clone(),
        first_name: stored.first_name.clone(),
        email: decode_text(stored.email.as_deref(), key)?.map(|d| d.into_inner()),
        phone: decode_text(stored.phone.as_deref(), key)?.map(|d| d.into_inner()),
        telegram: decode_text(stored.telegram.as_deref(), key)?.map(|d| d.into_inner()),
        date_of_birth: decode_date(stored.date_of_birth.as_deref(), key)?.map(|d| d.into_inner()),
        stipend_amount: decode_money(stored.stipend_amount.as_deref(), key)?
            .map(|d| d.into_inner()),
    })
}

/// Seals a payment's amount and receipt number for storage.
pub fn encode_payment(payment: &Payment, key: &MasterKey) -> StoreResult<StoredPayment> {
    // encode_money is Some-in/Some-out; amount is NOT NULL in the schema
    let amount = encode_money(Some(payment.amount), key)?
        .ok_or_else(|| StoreError::Invariant("payment amount encoded to NULL".into()))?;
    Ok(StoredPayment {
        id: payment.id,
        payer_id: payment.payer_id,
        payment_date: payment.payment_date.format("%Y-%m-%d").to_string(),
        amount,
        receipt_number: encode_text(payment.receipt_number.as_deref(), key)?,
    })
}

/// Opens a stored payment back into its plaintext form.
pub fn decode_payment(stored: &StoredPayment, key: &MasterKey) -> StoreResult<Payment> {
    let amount = decode_money(Some(stored.amount.as_str()), key)?
        .map(|d| d.into_inner())
        .ok_or_else(|| StoreError::Invariant("payment amount decoded to NULL".into()))?;
    let payment_date = NaiveDate::parse_from_str(&stored.payment_date, "%Y-%m-%d")
        .map_err(|e| CryptoError::Encoding {
            expected: "ISO-8601 date",
            detail: e.to_string(),
        })?;
    Ok(Payment {
        id: stored.id,
        payer_id: stored.payer_id,
        payment_date,
        amount,
        receipt_number: decode_text(stored.receipt_number.as_deref(), key)?
            .map(|d| d.into_inner()),
    })
}
