#![forbid(unsafe_code)]

mod error;
mod lifecycle;
mod offices;
mod quarantine;
mod query;
mod records;
mod requests;

pub use error::StoreError;
pub use lifecycle::{BatchOutcome, BatchReport};
pub use requests::*;

use reg_core::CENTRAL_OFFICE_KEY;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const DB_FILE_NAME: &str = "registros.db";
const SCHEMA_VERSION: i64 = 1;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Handle to the record database. Holds no connection: every operation
/// opens its own, runs to completion and releases it.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    storage_dir: PathBuf,
    db_path: PathBuf,
    config: StoreConfig,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_config(storage_dir, StoreConfig::default())
    }

    pub fn open_with_config(
        storage_dir: impl AsRef<Path>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let store = Self {
            storage_dir,
            db_path,
            config,
        };

        let conn = store.connect()?;
        conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get::<_, String>(0))?;
        preflight_gate(&conn)?;
        install_schema(&conn)?;

        info!(db_path = %store.db_path.display(), "record store opened");
        Ok(store)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(self.config.busy_timeout)?;
        register_functions(&conn)?;
        debug!("connection acquired");
        Ok(conn)
    }
}

/// `fold_case(text)` lower-cases with full Unicode rules; SQLite's own
/// `LOWER` only folds ASCII.
fn register_functions(conn: &Connection) -> Result<(), StoreError> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value = ctx.get::<Option<String>>(0)?;
            Ok(value.map(|value| value.to_lowercase()))
        },
    )?;
    Ok(())
}

/// Columns each table must carry for this build to read and write it.
const EXPECTED_TABLES: &[(&str, &[&str])] = &[
    (
        "schema_state",
        &["singleton", "schema_version", "created_at_ms", "updated_at_ms"],
    ),
    ("offices", &["office_key", "display_name", "created_at_ms"]),
    (
        "records",
        &[
            "id", "name", "tax_id", "office_key", "office_display", "action_type",
            "closing_date", "pending_notes", "process_number", "filing_date", "remarks",
            "referrer", "created_at_ms",
        ],
    ),
    (
        "quarantine",
        &[
            "id", "name", "tax_id", "origin_office_key", "origin_office_display",
            "action_type", "closing_date", "pending_notes", "process_number", "filing_date",
            "remarks", "referrer", "created_at_ms", "deleted_at_ms",
        ],
    ),
];

/// An empty file is fine (the schema is installed next). Anything else must
/// match [`EXPECTED_TABLES`] exactly at the table level and contain every
/// expected column; the stored version must be [`SCHEMA_VERSION`]. Nothing
/// is migrated in place.
fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let present = user_tables(conn)?;
    if present.is_empty() {
        return Ok(());
    }

    let reset = |reason: &'static str| -> Result<(), StoreError> {
        warn!(db_tables = present.len(), reason, "database refused");
        Err(StoreError::InvalidInput(reason))
    };

    let expected: BTreeSet<&str> = EXPECTED_TABLES.iter().map(|(table, _)| *table).collect();
    if present.iter().any(|table| !expected.contains(table.as_str())) {
        return reset("RESET_REQUIRED: database holds tables this store does not know");
    }

    for (table, columns) in EXPECTED_TABLES {
        if !present.contains(*table) {
            return reset("RESET_REQUIRED: a required table is missing");
        }
        let actual = table_columns(conn, table)?;
        if columns.iter().any(|column| !actual.contains(*column)) {
            return reset("RESET_REQUIRED: a table is missing required columns");
        }
    }

    let version: Option<i64> = conn
        .query_row(
            "SELECT schema_version FROM schema_state WHERE singleton=1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if version != Some(SCHEMA_VERSION) {
        return reset("RESET_REQUIRED: unsupported schema version");
    }
    Ok(())
}

fn user_tables(conn: &Connection) -> Result<BTreeSet<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
    Ok(names.collect::<Result<_, _>>()?)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;
    Ok(names.collect::<Result<_, _>>()?)
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS offices (
          office_key TEXT PRIMARY KEY,
          display_name TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          CHECK(length(office_key) > 0),
          CHECK(length(display_name) > 0)
        );

        CREATE INDEX IF NOT EXISTS idx_offices_display
          ON offices(display_name, office_key);

        CREATE TABLE IF NOT EXISTS records (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL,
          tax_id TEXT NOT NULL,
          office_key TEXT NOT NULL,
          office_display TEXT NOT NULL,
          action_type TEXT NOT NULL,
          closing_date TEXT,
          pending_notes TEXT NOT NULL,
          process_number TEXT NOT NULL,
          filing_date TEXT,
          remarks TEXT NOT NULL,
          referrer TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_records_office
          ON records(office_key, id);

        CREATE TABLE IF NOT EXISTS quarantine (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL,
          tax_id TEXT NOT NULL,
          origin_office_key TEXT NOT NULL,
          origin_office_display TEXT NOT NULL,
          action_type TEXT NOT NULL,
          closing_date TEXT,
          pending_notes TEXT NOT NULL,
          process_number TEXT NOT NULL,
          filing_date TEXT,
          remarks TEXT NOT NULL,
          referrer TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          deleted_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_quarantine_deleted
          ON quarantine(deleted_at_ms, id);
        "#,
    )?;

    conn.execute(
        "INSERT INTO schema_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO offices(office_key, display_name, created_at_ms) VALUES (?1, ?1, ?2)",
        params![CENTRAL_OFFICE_KEY, now_ms],
    )?;

    Ok(())
}

fn to_sqlite_i64(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("numeric overflow"))
}

fn count_to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn now_ms() -> i64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    let ms = nanos / 1_000_000i128;
    i64::try_from(ms.max(0)).unwrap_or(i64::MAX)
}
