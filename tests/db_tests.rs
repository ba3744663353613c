// tests/db_tests.rs
use std::collections::BTreeMap;

use serde_json::Value;
use tempfile::tempdir;

use encrypted_keyring::error::CoreError;
use encrypted_keyring::{open_record_db, RecordTable};

mod common;
mod support;
use support::{keyring_v1, rotate_to_v2, user_schema};

#[test]
fn test_save_and_find_roundtrip() {
    common::setup();
    let dir = tempdir().unwrap();
    let conn = open_record_db(dir.path().join("nested/app.db")).unwrap();
    let users = RecordTable::create(&conn, "users", user_schema(keyring_v1())).unwrap();

    let mut alice = users.build();
    alice.set("email", "alice@example.com").unwrap();
    alice.set("token", "abc").unwrap();
    let id = users.save(&mut alice).unwrap();
    assert_eq!(alice.id(), Some(id));

    let mut loaded = users.find(id).unwrap().unwrap();
    assert_eq!(loaded.keyring_id(), Some(1));
    assert!(!loaded.is_cached("email"));
    assert_eq!(
        loaded.get_string("email").unwrap().as_deref(),
        Some("alice@example.com")
    );
    assert_eq!(loaded.get("preferences").unwrap(), None);

    assert!(users.find(id + 100).unwrap().is_none());
}

#[test]
fn test_ciphertext_is_what_hits_the_disk() {
    let conn = open_record_db(":memory:").unwrap();
    let users = RecordTable::create(&conn, "users", user_schema(keyring_v1())).unwrap();

    let mut alice = users.build();
    alice.set("email", "alice@example.com").unwrap();
    let id = users.save(&mut alice).unwrap();

    let stored: String = conn
        .query_row("SELECT encrypted_email FROM users WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .unwrap();
    assert!(!stored.contains("alice"));
}

#[test]
fn test_update_keeps_the_same_row() {
    let conn = open_record_db(":memory:").unwrap();
    let users = RecordTable::create(&conn, "users", user_schema(keyring_v1())).unwrap();

    let mut alice = users.build();
    alice.set("email", "alice@example.com").unwrap();
    let id = users.save(&mut alice).unwrap();

    alice.set("email", "alice@new.example").unwrap();
    assert_eq!(users.save(&mut alice).unwrap(), id);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
    let mut loaded = users.find(id).unwrap().unwrap();
    assert_eq!(
        loaded.get_string("email").unwrap().as_deref(),
        Some("alice@new.example")
    );
}

#[test]
fn test_find_by_digest() {
    let conn = open_record_db(":memory:").unwrap();
    let users = RecordTable::create(&conn, "users", user_schema(keyring_v1())).unwrap();

    for email in ["alice@example.com", "bob@example.com", "alice@example.com"] {
        let mut user = users.build();
        user.set("email", email).unwrap();
        users.save(&mut user).unwrap();
    }

    let found = users.find_by_digest("email", "alice@example.com").unwrap();
    assert_eq!(found.len(), 2);
    for mut user in found {
        assert_eq!(
            user.get_string("email").unwrap().as_deref(),
            Some("alice@example.com")
        );
    }
    assert!(users.find_by_digest("email", "carol@example.com").unwrap().is_empty());

    assert!(matches!(
        users.find_by_digest("token", "x").unwrap_err(),
        CoreError::Config(_)
    ));
}

#[test]
fn test_rows_migrate_on_save_after_rotation() {
    let keyring = keyring_v1();
    let conn = open_record_db(":memory:").unwrap();
    let users = RecordTable::create(&conn, "users", user_schema(keyring.clone())).unwrap();

    let mut alice = users.build();
    alice.set("email", "alice@example.com").unwrap();
    let id = users.save(&mut alice).unwrap();

    rotate_to_v2(&keyring);

    // still readable through key 1
    let mut loaded = users.find(id).unwrap().unwrap();
    assert_eq!(loaded.keyring_id(), Some(1));
    assert_eq!(
        loaded.get_string("email").unwrap().as_deref(),
        Some("alice@example.com")
    );

    users.save(&mut loaded).unwrap();
    let mut reloaded = users.find(id).unwrap().unwrap();
    assert_eq!(reloaded.keyring_id(), Some(2));
    assert_eq!(
        reloaded.get_string("email").unwrap().as_deref(),
        Some("alice@example.com")
    );

    // digest lookups keep working across the rotation
    assert_eq!(users.find_by_digest("email", "alice@example.com").unwrap().len(), 1);
}

#[test]
fn test_rotate_all_sweeps_stale_rows() {
    let keyring = keyring_v1();
    let conn = open_record_db(":memory:").unwrap();
    let users = RecordTable::create(&conn, "users", user_schema(keyring.clone())).unwrap();

    for i in 0..3 {
        let mut user = users.build();
        user.set("email", format!("user{i}@example.com")).unwrap();
        users.save(&mut user).unwrap();
    }
    // a row with no encrypted values has no key id
    users.save(&mut users.build()).unwrap();

    assert_eq!(users.key_version_counts().unwrap(), BTreeMap::from([(1, 3)]));

    rotate_to_v2(&keyring);
    assert_eq!(users.rotate_all().unwrap(), 3);
    assert_eq!(users.key_version_counts().unwrap(), BTreeMap::from([(2, 3)]));
    assert_eq!(users.rotate_all().unwrap(), 0);

    let mut user = users.find_by_digest("email", "user1@example.com").unwrap().remove(0);
    assert_eq!(
        user.get_string("email").unwrap().as_deref(),
        Some("user1@example.com")
    );
}

#[test]
fn test_invalid_table_name_is_rejected() {
    let conn = open_record_db(":memory:").unwrap();
    let err = RecordTable::create(&conn, "users; DROP", user_schema(keyring_v1())).unwrap_err();
    assert!(matches!(err, CoreError::InvalidIdentifier(_)));

    let users = RecordTable::create(&conn, "users", user_schema(keyring_v1())).unwrap();
    let debug = format!("{users:?}");
    assert!(debug.contains("\"users\""));
    assert!(debug.contains("encrypted_email"));
}

#[test]
fn test_rotation_sweep_drains_rows_with_cleared_fields() {
    let keyring = keyring_v1();
    let conn = open_record_db(":memory:").unwrap();
    let users = RecordTable::create(&conn, "users", user_schema(keyring.clone())).unwrap();

    let mut user = users.build();
    user.set("email", "alice@example.com").unwrap();
    let id = users.save(&mut user).unwrap();

    user.set("email", Value::Null).unwrap();
    // key id is still set until the save
    assert_eq!(user.keyring_id(), Some(1));
    users.save(&mut user).unwrap();
    assert_eq!(users.find(id).unwrap().unwrap().keyring_id(), None);
    assert!(users.key_version_counts().unwrap().is_empty());

    rotate_to_v2(&keyring);
    assert_eq!(users.rotate_all().unwrap(), 0);
    assert_eq!(users.rotate_all().unwrap(), 0);
    assert!(users.key_version_counts().unwrap().is_empty());
}

#[test]
fn test_rotation_sweep_counts_only_rows_that_moved() {
    let keyring = keyring_v1();
    let conn = open_record_db(":memory:").unwrap();
    let users = RecordTable::create(&conn, "users", user_schema(keyring.clone())).unwrap();

    let mut alice = users.build();
    alice.set("email", "alice@example.com").unwrap();
    users.save(&mut alice).unwrap();

    // a row left on key 1 after its only value was nulled in the table
    let mut bob = users.build();
    bob.set("email", "bob@example.com").unwrap();
    let bob_id = users.save(&mut bob).unwrap();
    conn.execute(
        "UPDATE users SET encrypted_email = NULL, email_digest = NULL WHERE id = ?1",
        [bob_id],
    )
    .unwrap();

    rotate_to_v2(&keyring);
    assert_eq!(users.rotate_all().unwrap(), 2);
    assert_eq!(users.rotate_all().unwrap(), 0);
    assert_eq!(users.key_version_counts().unwrap(), BTreeMap::from([(2, 1)]));
    assert_eq!(users.find(bob_id).unwrap().unwrap().keyring_id(), None);
}
