//! Field codec tests: typed round trips, absent-value passthrough, legacy
//! plaintext handling, and the no-silent-fallback integrity policy.

use chrono::NaiveDate;
use profpay_crypto::{
    decode_date, decode_money, decode_text, encode_date, encode_money, encode_text,
    is_ciphertext, CryptoError, Decoded, MasterKey, Money,
};
use proptest::prelude::*;

// ── Text ──

#[test]
fn text_round_trip() {
    let key = MasterKey::generate();
    let token = encode_text(Some("ivanov@example.com"), &key).unwrap().unwrap();

    assert!(is_ciphertext(&token));
    assert_eq!(
        decode_text(Some(&token), &key).unwrap().unwrap(),
        Decoded::Value("ivanov@example.com".to_string())
    );
}

#[test]
fn absent_values_pass_through() {
    let key = MasterKey::generate();
    assert_eq!(encode_text(None, &key).unwrap(), None);
    assert_eq!(decode_text(None, &key).unwrap(), None);
    assert_eq!(encode_money(None, &key).unwrap(), None);
    assert_eq!(decode_money(None, &key).unwrap(), None);
    assert_eq!(encode_date(None, &key).unwrap(), None);
    assert_eq!(decode_date(None, &key).unwrap(), None);
}

#[test]
fn unmarked_value_reported_as_legacy_plaintext() {
    let key = MasterKey::generate();
    let decoded = decode_text(Some("+7 900 123-45-67"), &key).unwrap().unwrap();

    assert!(decoded.is_legacy());
    assert_eq!(decoded.into_inner(), "+7 900 123-45-67");
}

#[test]
fn tampered_token_is_integrity_error_not_plaintext() {
    // A marked token that fails authentication must surface as an error,
    // never as the raw stored value.
    let key = MasterKey::generate();
    let mut token = encode_text(Some("secret"), &key).unwrap().unwrap();
    token.truncate(token.len() - 2);

    let err = decode_text(Some(&token), &key).unwrap_err();
    assert!(matches!(
        err,
        CryptoError::Integrity | CryptoError::Malformed(_)
    ));
}

#[test]
fn foreign_key_token_is_integrity_error() {
    let token = encode_text(Some("secret"), &MasterKey::generate())
        .unwrap()
        .unwrap();
    let err = decode_text(Some(&token), &MasterKey::generate()).unwrap_err();
    assert!(matches!(err, CryptoError::Integrity));
}

// ── Money ──

#[test]
fn money_round_trip() {
    let key = MasterKey::generate();
    let amount = Money::from_minor_units(70050); // 700.50

    let token = encode_money(Some(amount), &key).unwrap().unwrap();
    assert_eq!(
        decode_money(Some(&token), &key).unwrap().unwrap(),
        Decoded::Value(amount)
    );
}

#[test]
fn legacy_money_must_still_parse() {
    let key = MasterKey::generate();

    let ok = decode_money(Some("700.50"), &key).unwrap().unwrap();
    assert_eq!(ok, Decoded::Legacy(Money::from_minor_units(70050)));

    let err = decode_money(Some("seven hundred"), &key).unwrap_err();
    assert!(matches!(err, CryptoError::Encoding { .. }));
}

// ── Dates ──

#[test]
fn date_round_trip() {
    let key = MasterKey::generate();
    let dob = NaiveDate::from_ymd_opt(2003, 5, 14).unwrap();

    let token = encode_date(Some(dob), &key).unwrap().unwrap();
    assert_eq!(
        decode_date(Some(&token), &key).unwrap().unwrap(),
        Decoded::Value(dob)
    );
}

#[test]
fn legacy_date_must_be_iso() {
    let key = MasterKey::generate();

    let ok = decode_date(Some("2003-05-14"), &key).unwrap().unwrap();
    assert_eq!(
        ok,
        Decoded::Legacy(NaiveDate::from_ymd_opt(2003, 5, 14).unwrap())
    );

    let err = decode_date(Some("14.05.2003"), &key).unwrap_err();
    assert!(matches!(err, CryptoError::Encoding { .. }));
}

// ── Properties ──

proptest! {
    #[test]
    fn any_text_survives_the_codec(s in ".*") {
        let key = MasterKey::generate();
        let token = encode_text(Some(&s), &key).unwrap().unwrap();
        prop_assert_eq!(
            decode_text(Some(&token), &key).unwrap().unwrap(),
            Decoded::Value(s)
        );
    }

    #[test]
    fn any_amount_survives_the_codec(minor in -1_000_000_000i64..1_000_000_000) {
        let key = MasterKey::generate();
        let amount = Money::from_minor_units(minor);
        let token = encode_money(Some(amount), &key).unwrap().unwrap();
        prop_assert_eq!(
            decode_money(Some(&token), &key).unwrap().unwrap(),
            Decoded::Value(amount)
        );
    }
}
