#![forbid(unsafe_code)]

use super::offices::{office_fetch, office_register_tx, resolve_office_label_tx};
use super::{
    CreateRecordRequest, OfficeTarget, RecordInput, RecordPatch, SqliteStore, StoreError,
    count_to_u64, now_ms,
};
use reg_core::{DEFAULT_REFERRER, IsoDate, Office, Record, RecordFields};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use tracing::{debug, info, warn};

pub(super) const RECORD_COLUMNS: &str = "id, name, tax_id, office_key, office_display, action_type, \
     closing_date, pending_notes, process_number, filing_date, remarks, referrer, created_at_ms";

impl SqliteStore {
    /// Creates a record under a registered office. The display name is
    /// copied from the registry at write time.
    pub fn record_create(&self, request: CreateRecordRequest) -> Result<Record, StoreError> {
        let fields = parse_record_input(&request.input)?;
        let office_key = request.office_key.trim();

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let office = office_fetch(&tx, office_key)?
            .ok_or_else(|| StoreError::UnknownOffice(office_key.to_string()))?;
        let record = record_insert_tx(&tx, &office, &fields, now_ms())?;
        tx.commit()?;

        info!(record_id = record.id, office_key = %record.office_key, "record created");
        Ok(record)
    }

    pub fn record_get(&self, id: i64) -> Result<Record, StoreError> {
        let conn = self.connect()?;
        record_fetch(&conn, id)?.ok_or(StoreError::UnknownRecord(id))
    }

    /// Applies a partial update. An office change always rewrites key and
    /// display together.
    pub fn record_update(&self, id: i64, patch: RecordPatch) -> Result<Record, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let current = record_fetch(&tx, id)?.ok_or(StoreError::UnknownRecord(id))?;

        let mut fields = current.fields.clone();
        apply_patch(&mut fields, &patch)?;

        // Without a re-tag the display is refreshed from the registry. A key
        // orphaned by an office delete is registered again from the display
        // the record carries, so the write never references a missing office.
        let office = match &patch.office {
            None => match office_fetch(&tx, &current.office_key)? {
                Some(office) => office,
                None => {
                    warn!(
                        record_id = id,
                        office_key = %current.office_key,
                        "office missing; re-registering"
                    );
                    office_register_tx(
                        &tx,
                        &current.office_key,
                        &current.office_display,
                        now_ms(),
                    )?
                }
            },
            Some(OfficeTarget::Key(key)) => {
                let key = key.trim();
                office_fetch(&tx, key)?.ok_or_else(|| StoreError::UnknownOffice(key.to_string()))?
            }
            Some(OfficeTarget::Label(label)) => resolve_office_label_tx(&tx, label, now_ms())?,
        };

        let updated = record_write_tx(&tx, id, &office, &fields)?;
        tx.commit()?;

        info!(record_id = id, office_key = %updated.office_key, "record updated");
        Ok(updated)
    }

    pub fn record_count(&self) -> Result<u64, StoreError> {
        let conn = self.connect()?;
        let count = conn.query_row("SELECT COUNT(1) FROM records", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(count_to_u64(count))
    }
}

/// Validates raw submission strings into a record payload.
pub(super) fn parse_record_input(input: &RecordInput) -> Result<RecordFields, StoreError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidInput("name must not be empty"));
    }
    Ok(RecordFields {
        name: name.to_string(),
        tax_id: input.tax_id.trim().to_string(),
        action_type: input.action_type.clone(),
        closing_date: parse_date(&input.closing_date, "closing_date must be YYYY-MM-DD")?,
        pending_notes: input.pending_notes.clone(),
        process_number: input.process_number.clone(),
        filing_date: parse_date(&input.filing_date, "filing_date must be YYYY-MM-DD")?,
        remarks: input.remarks.clone(),
        referrer: referrer_or_default(&input.referrer),
    })
}

fn apply_patch(fields: &mut RecordFields, patch: &RecordPatch) -> Result<(), StoreError> {
    if let Some(name) = &patch.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("name must not be empty"));
        }
        fields.name = name.to_string();
    }
    if let Some(tax_id) = &patch.tax_id {
        fields.tax_id = tax_id.trim().to_string();
    }
    if let Some(action_type) = &patch.action_type {
        fields.action_type = action_type.clone();
    }
    if let Some(raw) = &patch.closing_date {
        fields.closing_date = parse_date(raw, "closing_date must be YYYY-MM-DD")?;
    }
    if let Some(pending_notes) = &patch.pending_notes {
        fields.pending_notes = pending_notes.clone();
    }
    if let Some(process_number) = &patch.process_number {
        fields.process_number = process_number.clone();
    }
    if let Some(raw) = &patch.filing_date {
        fields.filing_date = parse_date(raw, "filing_date must be YYYY-MM-DD")?;
    }
    if let Some(remarks) = &patch.remarks {
        fields.remarks = remarks.clone();
    }
    if let Some(referrer) = &patch.referrer {
        fields.referrer = referrer_or_default(referrer);
    }
    Ok(())
}

fn referrer_or_default(raw: &str) -> String {
    match raw.trim() {
        "" => DEFAULT_REFERRER.to_string(),
        referrer => referrer.to_string(),
    }
}

fn parse_date(raw: &str, message: &'static str) -> Result<Option<IsoDate>, StoreError> {
    IsoDate::parse_optional(raw).map_err(|_| StoreError::InvalidInput(message))
}

pub(super) fn record_fetch(conn: &Connection, id: i64) -> Result<Option<Record>, StoreError> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM records WHERE id=?1");
    Ok(conn.query_row(&sql, params![id], record_from_row).optional()?)
}

pub(super) fn record_insert_tx(
    tx: &Transaction<'_>,
    office: &Office,
    fields: &RecordFields,
    created_at_ms: i64,
) -> Result<Record, StoreError> {
    tx.execute(
        r#"
        INSERT INTO records(
          name, tax_id, office_key, office_display, action_type, closing_date,
          pending_notes, process_number, filing_date, remarks, referrer, created_at_ms
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            fields.name,
            fields.tax_id,
            office.key,
            office.display_name,
            fields.action_type,
            fields.closing_date.map(|date| date.to_string()),
            fields.pending_notes,
            fields.process_number,
            fields.filing_date.map(|date| date.to_string()),
            fields.remarks,
            fields.referrer,
            created_at_ms,
        ],
    )?;

    Ok(Record {
        id: tx.last_insert_rowid(),
        office_key: office.key.clone(),
        office_display: office.display_name.clone(),
        fields: fields.clone(),
        created_at_ms,
    })
}

/// Rewrites every mutable column of an existing row.
pub(super) fn record_write_tx(
    tx: &Transaction<'_>,
    id: i64,
    office: &Office,
    fields: &RecordFields,
) -> Result<Record, StoreError> {
    let updated = tx.execute(
        r#"
        UPDATE records
           SET name=?2, tax_id=?3, office_key=?4, office_display=?5, action_type=?6,
               closing_date=?7, pending_notes=?8, process_number=?9, filing_date=?10,
               remarks=?11, referrer=?12
         WHERE id=?1
        "#,
        params![
            id,
            fields.name,
            fields.tax_id,
            office.key,
            office.display_name,
            fields.action_type,
            fields.closing_date.map(|date| date.to_string()),
            fields.pending_notes,
            fields.process_number,
            fields.filing_date.map(|date| date.to_string()),
            fields.remarks,
            fields.referrer,
        ],
    )?;
    if updated == 0 {
        return Err(StoreError::UnknownRecord(id));
    }

    record_fetch(tx, id)?.ok_or(StoreError::UnknownRecord(id))
}

/// Deletes the row and hands back what it held.
pub(super) fn record_remove_tx(tx: &Transaction<'_>, id: i64) -> Result<Record, StoreError> {
    let record = record_fetch(tx, id)?.ok_or(StoreError::UnknownRecord(id))?;
    tx.execute("DELETE FROM records WHERE id=?1", params![id])?;
    debug!(record_id = id, "record row removed");
    Ok(record)
}

pub(super) fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        office_key: row.get(3)?,
        office_display: row.get(4)?,
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
    })
}

pub(super) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<IsoDate>> {
    let raw = row.get::<_, Option<String>>(idx)?;
    raw.as_deref()
        .map(|value| {
            IsoDate::parse(value).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
            })
        })
        .transpose()
}
