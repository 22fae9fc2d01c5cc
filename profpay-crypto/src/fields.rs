//! Type-aware field encryption adapters.
//!
//! Every sensitive field crosses this layer on its way to and from the
//! store: text as UTF-8, money as its canonical two-decimal string, dates
//! as ISO-8601. Absent values pass through without touching the cipher.
//!
//! Decoding never guesses. A value without the token marker is returned as
//! [`Decoded::Legacy`] (pre-migration plaintext) and logged; a marked token
//! that fails authentication is an integrity error, full stop.

use chrono::NaiveDate;
use tracing::warn;

use crate::cipher::{is_ciphertext, open, seal};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::MasterKey;
use crate::money::Money;

/// Outcome of decoding a stored field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded<T> {
    /// The value was a token and decrypted + parsed cleanly.
    Value(T),
    /// The value carried no token marker: legacy plaintext, returned
    /// verbatim. Only expected before the one-shot migration has run.
    Legacy(T),
}

impl<T> Decoded<T> {
    /// The contained value, regardless of provenance.
    pub fn into_inner(self) -> T {
        match self {
            Decoded::Value(v) | Decoded::Legacy(v) => v,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Decoded::Legacy(_))
    }
}

/// Encrypts an optional text field.
pub fn encode_text(value: Option<&str>, key: &MasterKey) -> CryptoResult<Option<String>> {
    value
        .map(|v| seal(v.as_bytes(), key.as_bytes()))
        .transpose()
}

/// Decrypts an optional text field.
pub fn decode_text(
    stored: Option<&str>,
    key: &MasterKey,
) -> CryptoResult<Option<Decoded<String>>> {
    let Some(stored) = stored else { return Ok(None) };

    if !is_ciphertext(stored) {
        warn!("text field holds unmigrated plaintext");
        return Ok(Some(Decoded::Legacy(stored.to_string())));
    }

    let bytes = open(stored, key.as_bytes())?;
    let text = String::from_utf8(bytes).map_err(|e| CryptoError::Encoding {
        expected: "utf-8 string",
        detail: e.to_string(),
    })?;
    Ok(Some(Decoded::Value(text)))
}

/// Encrypts an optional money field via its canonical decimal string.
pub fn encode_money(value: Option<Money>, key: &MasterKey) -> CryptoResult<Option<String>> {
    value
        .map(|v| seal(v.to_string().as_bytes(), key.as_bytes()))
        .transpose()
}

/// Decrypts an optional money field.
///
/// A payload that decrypts but does not parse as a two-decimal amount is a
/// data-integrity fault: the system only ever seals canonical strings.
pub fn decode_money(
    stored: Option<&str>,
    key: &MasterKey,
) -> CryptoResult<Option<Decoded<Money>>> {
    decode_parsed(stored, key, "decimal amount", |s| s.parse::<Money>().ok())
}

/// Encrypts an optional calendar-date field as ISO-8601.
pub fn encode_date(value: Option<NaiveDate>, key: &MasterKey) -> CryptoResult<Option<String>> {
    value
        .map(|v| seal(v.format("%Y-%m-%d").to_string().as_bytes(), key.as_bytes()))
        .transpose()
}

/// Decrypts an optional calendar-date field.
pub fn decode_date(
    stored: Option<&str>,
    key: &MasterKey,
) -> CryptoResult<Option<Decoded<NaiveDate>>> {
    decode_parsed(stored, key, "ISO-8601 date", |s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    })
}

/// Shared decrypt-then-parse path for the typed adapters. Legacy plaintext
/// must parse as the logical type too; a field that is neither a token
/// nor a parsable value is reported against the expected type.
fn decode_parsed<T>(
    stored: Option<&str>,
    key: &MasterKey,
    expected: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> CryptoResult<Option<Decoded<T>>> {
    let Some(stored) = stored else { return Ok(None) };

    if !is_ciphertext(stored) {
        warn!(expected, "field holds unmigrated plaintext");
        let value = parse(stored).ok_or_else(|| CryptoError::Encoding {
            expected,
            detail: format!("unparsable legacy value ({} chars)", stored.len()),
        })?;
        return Ok(Some(Decoded::Legacy(value)));
    }

    let bytes = open(stored, key.as_bytes())?;
    let text = String::from_utf8(bytes).map_err(|e| CryptoError::Encoding {
        expected,
        detail: e.to_string(),
    })?;
    let value = parse(&text).ok_or_else(|| CryptoError::Encoding {
        expected,
        detail: format!("unparsable decrypted value ({} chars)", text.len()),
    })?;
    Ok(Some(Decoded::Value(value)))
}
