#![forbid(unsafe_code)]

use super::records::date_column;
use super::{SqliteStore, StoreError, count_to_u64};
use reg_core::{QuarantineEntry, Record, RecordFields};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use tracing::debug;

const QUARANTINE_COLUMNS: &str = "id, name, tax_id, origin_office_key, origin_office_display, \
     action_type, closing_date, pending_notes, process_number, filing_date, remarks, referrer, \
     created_at_ms, deleted_at_ms";

impl SqliteStore {
    pub fn quarantine_get(&self, id: i64) -> Result<QuarantineEntry, StoreError> {
        let conn = self.connect()?;
        quarantine_fetch(&conn, id)?.ok_or(StoreError::UnknownQuarantineEntry(id))
    }

    /// Newest deletion first.
    pub fn quarantine_list(&self) -> Result<Vec<QuarantineEntry>, StoreError> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {QUARANTINE_COLUMNS} FROM quarantine ORDER BY deleted_at_ms DESC, id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], quarantine_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        debug!(count = out.len(), "quarantine listed");
        Ok(out)
    }

    pub fn quarantine_count(&self) -> Result<u64, StoreError> {
        let conn = self.connect()?;
        let count = conn.query_row("SELECT COUNT(1) FROM quarantine", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(count_to_u64(count))
    }
}

pub(super) fn quarantine_fetch(
    conn: &Connection,
    id: i64,
) -> Result<Option<QuarantineEntry>, StoreError> {
    let sql = format!("SELECT {QUARANTINE_COLUMNS} FROM quarantine WHERE id=?1");
    Ok(conn
        .query_row(&sql, params![id], quarantine_from_row)
        .optional()?)
}

/// Files a copy of `record` with its current office captured as origin.
pub(super) fn quarantine_insert_tx(
    tx: &Transaction<'_>,
    record: &Record,
    deleted_at_ms: i64,
) -> Result<QuarantineEntry, StoreError> {
    let fields = &record.fields;
    tx.execute(
        r#"
        INSERT INTO quarantine(
          name, tax_id, origin_office_key, origin_office_display, action_type, closing_date,
          pending_notes, process_number, filing_date, remarks, referrer, created_at_ms,
          deleted_at_ms
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            fields.name,
            fields.tax_id,
            record.office_key,
            record.office_display,
            fields.action_type,
            fields.closing_date.map(|date| date.to_string()),
            fields.pending_notes,
            fields.process_number,
            fields.filing_date.map(|date| date.to_string()),
            fields.remarks,
            fields.referrer,
            record.created_at_ms,
            deleted_at_ms,
        ],
    )?;

    Ok(QuarantineEntry {
        id: tx.last_insert_rowid(),
        origin_office_key: record.office_key.clone(),
        origin_office_display: record.office_display.clone(),
        fields: fields.clone(),
        created_at_ms: record.created_at_ms,
        deleted_at_ms,
    })
}

pub(super) fn quarantine_remove_tx(
    tx: &Transaction<'_>,
    id: i64,
) -> Result<QuarantineEntry, StoreError> {
    let entry = quarantine_fetch(tx, id)?.ok_or(StoreError::UnknownQuarantineEntry(id))?;
    tx.execute("DELETE FROM quarantine WHERE id=?1", params![id])?;
    debug!(entry_id = id, "quarantine row removed");
    Ok(entry)
}

fn quarantine_from_row(row: &Row<'_>) -> rusqlite::Result<QuarantineEntry> {
    Ok(QuarantineEntry {
        id: row.get(0)?,
        origin_office_key: row.get(3)?,
        origin_office_display: row.get(4)?,
        fields: RecordFields {
            name: row.get(1)?,
            tax_id: row.get(2)?,
            action_type: row.get(5)?,
            closing_date: date_column(row, 6)?,
            pending_notes: row.get(7)?,
            process_number: row.get(8)?,
            filing_date: date_column(row, 9)?,
            remarks: row.get(10)?,
            referrer: row.get(11)?,
        },
        created_at_ms: row.get(12)?,
        deleted_at_ms: row.get(13)?,
    })
}
