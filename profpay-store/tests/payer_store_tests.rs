//! Payer store tests: the codec boundary on every read and write, token
//! hygiene at rest, and decryption-failure surfacing.

mod support;

use chrono::NaiveDate;
use profpay_crypto::{is_ciphertext, MasterKey, Money};
use profpay_store::{NewPayer, NewPayment, PayerStore, StoreError};
use support::*;

fn sample_payer() -> NewPayer {
    NewPayer {
        last_name: "Ivanova".to_string(),
        first_name: "Anna".to_string(),
        email: Some("anna@example.com".to_string()),
        phone: Some("+7 900 123-45-67".to_string()),
        telegram: Some("@anna".to_string()),
        date_of_birth: NaiveDate::from_ymd_opt(2003, 5, 14),
        stipend_amount: Some(Money::from_minor_units(70000)),
    }
}

#[test]
fn create_then_get_round_trip() {
    let db = open_db();
    let store = PayerStore::new(db.clone());
    let key = MasterKey::generate();

    let created = store.create_payer(&sample_payer(), &key).unwrap();
    let fetched = store.get_payer(created.id, &key).unwrap().unwrap();

    assert_eq!(fetched, created);
}

#[test]
fn sensitive_columns_hold_tokens_at_rest() {
    let db = open_db();
    let store = PayerStore::new(db.clone());
    let key = MasterKey::generate();
    let created = store.create_payer(&sample_payer(), &key).unwrap();

    for column in ["email", "phone", "telegram", "date_of_birth", "stipend_amount"] {
        let raw = raw_payer_column(&db, created.id, column).unwrap();
        assert!(is_ciphertext(&raw), "{column} stored in plaintext");
    }

    // Searchable name columns stay plaintext.
    let conn = db.lock().unwrap();
    let last_name: String = conn
        .query_row(
            "SELECT last_name FROM payers WHERE id = ?",
            duckdb::params![created.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(last_name, "Ivanova");
}

#[test]
fn absent_fields_stay_null() {
    let db = open_db();
    let store = PayerStore::new(db.clone());
    let key = MasterKey::generate();

    let minimal = NewPayer {
        last_name: "Petrov".to_string(),
        first_name: "Pyotr".to_string(),
        ..Default::default()
    };
    let created = store.create_payer(&minimal, &key).unwrap();

    assert!(raw_payer_column(&db, created.id, "email").is_none());
    let fetched = store.get_payer(created.id, &key).unwrap().unwrap();
    assert_eq!(fetched.email, None);
    assert_eq!(fetched.stipend_amount, None);
}

#[test]
fn update_reseals_fields() {
    let db = open_db();
    let store = PayerStore::new(db.clone());
    let key = MasterKey::generate();

    let mut payer = store.create_payer(&sample_payer(), &key).unwrap();
    let old_token = raw_payer_column(&db, payer.id, "phone").unwrap();

    payer.phone = Some("+7 900 765-43-21".to_string());
    store.update_payer(&payer, &key).unwrap();

    let new_token = raw_payer_column(&db, payer.id, "phone").unwrap();
    assert_ne!(old_token, new_token);
    assert_eq!(
        store.get_payer(payer.id, &key).unwrap().unwrap().phone,
        payer.phone
    );
}

#[test]
fn update_of_missing_payer_errors() {
    let db = open_db();
    let store = PayerStore::new(db.clone());
    let key = MasterKey::generate();
    let mut payer = store.create_payer(&sample_payer(), &key).unwrap();
    payer.id = 9999;

    assert!(matches!(
        store.update_payer(&payer, &key),
        Err(StoreError::PayerNotFound(9999))
    ));
}

#[test]
fn foreign_key_cannot_read_fields() {
    let db = open_db();
    let store = PayerStore::new(db.clone());
    let key = MasterKey::generate();
    let created = store.create_payer(&sample_payer(), &key).unwrap();

    let err = store.get_payer(created.id, &MasterKey::generate()).unwrap_err();
    assert!(matches!(err, StoreError::Crypto(_)));
}

#[test]
fn list_orders_by_name() {
    let db = open_db();
    let store = PayerStore::new(db.clone());
    let key = MasterKey::generate();

    for last in ["Sidorov", "Ivanov", "Petrov"] {
        let payer = NewPayer {
            last_name: last.to_string(),
            first_name: "X".to_string(),
            ..Default::default()
        };
        store.create_payer(&payer, &key).unwrap();
    }

    let names: Vec<String> = store
        .list_payers(&key)
        .unwrap()
        .into_iter()
        .map(|p| p.last_name)
        .collect();
    assert_eq!(names, ["Ivanov", "Petrov", "Sidorov"]);
}

#[test]
fn payments_round_trip_with_encrypted_amounts() {
    let db = open_db();
    let store = PayerStore::new(db.clone());
    let key = MasterKey::generate();
    let payer = store.create_payer(&sample_payer(), &key).unwrap();

    let first = store
        .record_payment(
            &NewPayment {
                payer_id: payer.id,
                payment_date: NaiveDate::from_ymd_opt(2024, 9, 10).unwrap(),
                amount: Money::from_minor_units(35000),
                receipt_number: Some("R-001".to_string()),
            },
            &key,
        )
        .unwrap();
    let second = store
        .record_payment(
            &NewPayment {
                payer_id: payer.id,
                payment_date: NaiveDate::from_ymd_opt(2025, 2, 15).unwrap(),
                amount: Money::from_minor_units(35000),
                receipt_number: None,
            },
            &key,
        )
        .unwrap();

    // Amounts are tokens at rest.
    {
        let conn = db.lock().unwrap();
        let raw: String = conn
            .query_row(
                "SELECT amount FROM payments WHERE id = ?",
                duckdb::params![first.id],
                |row| row.get(0),
            )
            .unwrap();
        assert!(is_ciphertext(&raw));
    }

    // Newest first.
    let payments = store.payments_for(payer.id, &key).unwrap();
    assert_eq!(payments, vec![second, first]);
}
