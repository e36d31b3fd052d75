#![forbid(unsafe_code)]

use reg_storage::{CreateRecordRequest, RecordInput, SqliteStore, StoreConfig, StoreError};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

fn seed_raw(dir: &Path, sql: &str) {
    let conn = Connection::open(dir.join("registros.db")).expect("open raw db");
    conn.execute_batch(sql).expect("seed raw schema");
}

fn assert_reset_required(dir: &Path) {
    let err = SqliteStore::open(dir).expect_err("database must be refused");
    assert_eq!(err.code(), "RESET_REQUIRED");
    assert!(matches!(err, StoreError::InvalidInput(_)));
}

#[test]
fn unknown_tables_are_refused() {
    let dir = tempfile::tempdir().expect("create temp dir");
    seed_raw(dir.path(), "CREATE TABLE clientes(id INTEGER PRIMARY KEY, nome TEXT);");
    assert_reset_required(dir.path());
}

#[test]
fn extra_table_next_to_a_valid_schema_is_refused() {
    let dir = tempfile::tempdir().expect("create temp dir");
    SqliteStore::open(dir.path()).expect("fresh storage should open");
    seed_raw(dir.path(), "CREATE TABLE users(id INTEGER PRIMARY KEY);");
    assert_reset_required(dir.path());
}

#[test]
fn records_table_without_office_display_is_refused() {
    let dir = tempfile::tempdir().expect("create temp dir");
    SqliteStore::open(dir.path()).expect("fresh storage should open");
    seed_raw(
        dir.path(),
        "DROP TABLE records;
         CREATE TABLE records(
           id INTEGER PRIMARY KEY AUTOINCREMENT,
           name TEXT NOT NULL,
           tax_id TEXT NOT NULL,
           office_key TEXT NOT NULL,
           action_type TEXT NOT NULL,
           closing_date TEXT,
           pending_notes TEXT NOT NULL,
           process_number TEXT NOT NULL,
           filing_date TEXT,
           remarks TEXT NOT NULL,
           referrer TEXT NOT NULL,
           created_at_ms INTEGER NOT NULL
         );",
    );
    assert_reset_required(dir.path());
}

#[test]
fn missing_quarantine_table_is_refused() {
    let dir = tempfile::tempdir().expect("create temp dir");
    SqliteStore::open(dir.path()).expect("fresh storage should open");
    seed_raw(dir.path(), "DROP TABLE quarantine;");
    assert_reset_required(dir.path());
}

#[test]
fn other_schema_versions_are_refused() {
    let dir = tempfile::tempdir().expect("create temp dir");
    SqliteStore::open(dir.path()).expect("fresh storage should open");
    seed_raw(dir.path(), "UPDATE schema_state SET schema_version = 2;");
    assert_reset_required(dir.path());
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let id = {
        let store = SqliteStore::open_with_config(
            dir.path(),
            StoreConfig {
                busy_timeout: Duration::from_millis(250),
            },
        )
        .expect("open store");
        store.office_register("RIO", "Rio").expect("register");
        store
            .record_create(CreateRecordRequest {
                office_key: "RIO".to_string(),
                input: RecordInput {
                    name: "Ana".to_string(),
                    ..RecordInput::default()
                },
            })
            .expect("create")
            .id
    };

    let store = SqliteStore::open(dir.path()).expect("reopen passes the gate");
    assert_eq!(store.record_get(id).expect("record").fields.name, "Ana");
    assert_eq!(store.office_get("RIO").expect("office").display_name, "Rio");
    assert_eq!(store.office_list().expect("offices").len(), 2);
}
