#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError, count_to_u64, now_ms};
use reg_core::{
    CENTRAL_OFFICE_KEY, Office, is_canonical_office_key, is_central_office, is_reserved_office_key,
    normalize_office_key, office_display_from_label,
};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::{debug, info};

impl SqliteStore {
    /// Inserts the office if its key is new. An existing office is returned
    /// untouched: registration never overwrites a display name.
    pub fn office_register(&self, key: &str, display: &str) -> Result<Office, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let office = office_register_tx(&tx, key, display, now_ms())?;
        tx.commit()?;
        Ok(office)
    }

    /// Explicit creation from a free-text name. Unlike [`Self::office_register`]
    /// a key that already exists is a conflict.
    pub fn office_create(&self, name: &str) -> Result<Office, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidInput("office name must not be empty"));
        }
        let key = normalize_office_key(name);
        check_office_key(&key)?;
        let display = office_display_from_label(name);

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        if office_fetch(&tx, &key)?.is_some() {
            return Err(StoreError::OfficeAlreadyExists(key));
        }
        let office = office_register_tx(&tx, &key, &display, now_ms())?;
        tx.commit()?;
        Ok(office)
    }

    pub fn office_get(&self, key: &str) -> Result<Office, StoreError> {
        let conn = self.connect()?;
        office_fetch(&conn, key.trim())?.ok_or_else(|| StoreError::UnknownOffice(key.to_string()))
    }

    /// All offices ordered by display name.
    pub fn office_list(&self) -> Result<Vec<Office>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT office_key, display_name FROM offices ORDER BY display_name ASC, office_key ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Office {
                key: row.get(0)?,
                display_name: row.get(1)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        debug!(count = out.len(), "offices listed");
        Ok(out)
    }

    /// Changes the display name only. Records keep the display they were
    /// last written with until their next update or migration.
    pub fn office_rename(&self, key: &str, new_display: &str) -> Result<Office, StoreError> {
        let key = key.trim();
        let new_display = new_display.trim();
        if new_display.is_empty() {
            return Err(StoreError::InvalidInput("display name must not be empty"));
        }

        let conn = self.connect()?;
        let updated = conn.execute(
            "UPDATE offices SET display_name=?2 WHERE office_key=?1",
            params![key, new_display],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownOffice(key.to_string()));
        }

        info!(office_key = key, "office renamed");
        Ok(Office {
            key: key.to_string(),
            display_name: new_display.to_string(),
        })
    }

    /// Removes the office row. Records still tagged with the key are left
    /// as they are, pointing at an office that no longer exists.
    pub fn office_delete(&self, key: &str) -> Result<(), StoreError> {
        let key = key.trim();
        if is_central_office(key) {
            return Err(StoreError::ProtectedOffice);
        }

        let conn = self.connect()?;
        let deleted = conn.execute("DELETE FROM offices WHERE office_key=?1", params![key])?;
        if deleted == 0 {
            return Err(StoreError::UnknownOffice(key.to_string()));
        }

        let orphaned = office_record_count_q(&conn, key)?;
        info!(office_key = key, orphaned_records = orphaned, "office deleted");
        Ok(())
    }

    /// Number of active records tagged with `key`, registered or not.
    pub fn office_record_count(&self, key: &str) -> Result<u64, StoreError> {
        let conn = self.connect()?;
        office_record_count_q(&conn, key.trim())
    }
}

pub(super) fn office_fetch(conn: &Connection, key: &str) -> Result<Option<Office>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT office_key, display_name FROM offices WHERE office_key=?1",
            params![key],
            |row| {
                Ok(Office {
                    key: row.get(0)?,
                    display_name: row.get(1)?,
                })
            },
        )
        .optional()?)
}

/// Idempotent insert. The display name is only validated when a new row is
/// written; an existing office comes back untouched whatever display is passed.
pub(super) fn office_register_tx(
    tx: &Transaction<'_>,
    key: &str,
    display: &str,
    now_ms: i64,
) -> Result<Office, StoreError> {
    check_office_key(key)?;
    if let Some(existing) = office_fetch(tx, key)? {
        return Ok(existing);
    }

    let display = display.trim();
    if display.is_empty() {
        return Err(StoreError::InvalidInput("display name must not be empty"));
    }
    tx.execute(
        "INSERT INTO offices(office_key, display_name, created_at_ms) VALUES (?1, ?2, ?3)",
        params![key, display, now_ms],
    )?;
    info!(office_key = key, "office registered");

    Ok(Office {
        key: key.to_string(),
        display_name: display.to_string(),
    })
}

fn check_office_key(key: &str) -> Result<(), StoreError> {
    if !is_canonical_office_key(key) {
        return Err(StoreError::InvalidInput("office key must be canonical"));
    }
    if is_reserved_office_key(key) {
        return Err(StoreError::InvalidInput(
            "office key ALL is reserved for listing every office",
        ));
    }
    Ok(())
}

/// Resolves a typed office label: blank means `CENTRAL`, an exact match on
/// an existing display name wins, anything else is normalized and registered.
pub(super) fn resolve_office_label_tx(
    tx: &Transaction<'_>,
    label: &str,
    now_ms: i64,
) -> Result<Office, StoreError> {
    let label = label.trim();
    if label.is_empty() {
        return office_register_tx(tx, CENTRAL_OFFICE_KEY, CENTRAL_OFFICE_KEY, now_ms);
    }

    let display = office_display_from_label(label);
    let existing = tx
        .query_row(
            "SELECT office_key, display_name FROM offices WHERE display_name=?1 \
             ORDER BY office_key ASC LIMIT 1",
            params![display],
            |row| {
                Ok(Office {
                    key: row.get(0)?,
                    display_name: row.get(1)?,
                })
            },
        )
        .optional()?;
    if let Some(office) = existing {
        return Ok(office);
    }

    office_register_tx(tx, &normalize_office_key(label), &display, now_ms)
}

fn office_record_count_q(conn: &Connection, key: &str) -> Result<u64, StoreError> {
    let count = conn.query_row(
        "SELECT COUNT(1) FROM records WHERE office_key=?1",
        params![key],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count_to_u64(count))
}
