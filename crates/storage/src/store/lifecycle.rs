#![forbid(unsafe_code)]

use super::offices::{office_fetch, office_register_tx, resolve_office_label_tx};
use super::quarantine::{quarantine_fetch, quarantine_insert_tx, quarantine_remove_tx};
use super::records::{
    parse_record_input, record_fetch, record_insert_tx, record_remove_tx, record_write_tx,
};
use super::{SqliteStore, StoreError, SubmitRecordRequest, now_ms};
use reg_core::{QuarantineEntry, Record, normalize_office_key, office_display_from_label};
use tracing::{info, warn};

/// Result of one id inside a batch call.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub id: i64,
    pub result: Result<T, StoreError>,
}

/// Per-id outcomes of a best-effort batch, in request order.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub outcomes: Vec<BatchOutcome<T>>,
}

impl<T> BatchReport<T> {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (i64, &StoreError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|err| (outcome.id, err)))
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }
}

impl SqliteStore {
    /// Full submission path: resolves the office label (registering a new
    /// office when needed) and creates the record in one transaction.
    pub fn submit_record(&self, request: SubmitRecordRequest) -> Result<Record, StoreError> {
        let fields = parse_record_input(&request.input)?;
        let now_ms = now_ms();

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let office = resolve_office_label_tx(&tx, &request.office_label, now_ms)?;
        let record = record_insert_tx(&tx, &office, &fields, now_ms)?;
        tx.commit()?;

        info!(record_id = record.id, office_key = %record.office_key, "record submitted");
        Ok(record)
    }

    /// Moves an active record into quarantine. The quarantine row is written
    /// before the active row is removed, inside one transaction.
    pub fn soft_delete(&self, record_id: i64) -> Result<QuarantineEntry, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let record = record_fetch(&tx, record_id)?.ok_or(StoreError::UnknownRecord(record_id))?;
        let entry = quarantine_insert_tx(&tx, &record, now_ms())?;
        record_remove_tx(&tx, record_id)?;
        tx.commit()?;

        info!(
            record_id,
            entry_id = entry.id,
            origin_office_key = %entry.origin_office_key,
            "record quarantined"
        );
        Ok(entry)
    }

    /// Brings a quarantined entry back as a new active record (new id).
    /// If the origin office was deleted meanwhile, it is re-created from the
    /// captured display name.
    pub fn restore(&self, entry_id: i64) -> Result<Record, StoreError> {
        let now_ms = now_ms();
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let entry = quarantine_fetch(&tx, entry_id)?
            .ok_or(StoreError::UnknownQuarantineEntry(entry_id))?;

        let office = match office_fetch(&tx, &entry.origin_office_key)? {
            Some(office) => office,
            None => {
                let key = normalize_office_key(&entry.origin_office_display);
                warn!(
                    entry_id,
                    origin_office_key = %entry.origin_office_key,
                    office_key = %key,
                    "origin office missing; re-registering"
                );
                office_register_tx(&tx, &key, &entry.origin_office_display, now_ms)?
            }
        };

        let record = record_insert_tx(&tx, &office, &entry.fields, entry.created_at_ms)?;
        quarantine_remove_tx(&tx, entry_id)?;
        tx.commit()?;

        info!(entry_id, record_id = record.id, office_key = %record.office_key, "record restored");
        Ok(record)
    }

    /// Irreversibly erases a quarantine entry.
    pub fn purge(&self, entry_id: i64) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        quarantine_remove_tx(&tx, entry_id)?;
        tx.commit()?;

        info!(entry_id, "quarantine entry purged");
        Ok(())
    }

    /// Re-tags an active record to the office named by `target_office_name`,
    /// registering that office if it is new.
    pub fn migrate(&self, record_id: i64, target_office_name: &str) -> Result<Record, StoreError> {
        if target_office_name.trim().is_empty() {
            return Err(StoreError::InvalidInput("target office must not be empty"));
        }
        let key = normalize_office_key(target_office_name);
        let display = office_display_from_label(target_office_name);

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let record = record_fetch(&tx, record_id)?.ok_or(StoreError::UnknownRecord(record_id))?;
        let office = office_register_tx(&tx, &key, &display, now_ms())?;
        let migrated = record_write_tx(&tx, record_id, &office, &record.fields)?;
        tx.commit()?;

        info!(
            record_id,
            from_office_key = %record.office_key,
            to_office_key = %migrated.office_key,
            "record migrated"
        );
        Ok(migrated)
    }

    /// Returns the quarantine entry id per record.
    pub fn soft_delete_many(&self, record_ids: &[i64]) -> BatchReport<i64> {
        run_batch("soft_delete", record_ids, |id| {
            self.soft_delete(id).map(|entry| entry.id)
        })
    }

    /// Returns the new record id per quarantine entry.
    pub fn restore_many(&self, entry_ids: &[i64]) -> BatchReport<i64> {
        run_batch("restore", entry_ids, |id| {
            self.restore(id).map(|record| record.id)
        })
    }

    pub fn purge_many(&self, entry_ids: &[i64]) -> BatchReport<()> {
        run_batch("purge", entry_ids, |id| self.purge(id))
    }

    pub fn migrate_many(&self, record_ids: &[i64], target_office_name: &str) -> BatchReport<()> {
        run_batch("migrate", record_ids, |id| {
            self.migrate(id, target_office_name).map(|_| ())
        })
    }
}

/// Applies `op` to every id in order; a failure is recorded and the batch
/// moves on.
fn run_batch<T>(
    operation: &'static str,
    ids: &[i64],
    mut op: impl FnMut(i64) -> Result<T, StoreError>,
) -> BatchReport<T> {
    let mut outcomes = Vec::with_capacity(ids.len());
    for &id in ids {
        let result = op(id);
        if let Err(err) = &result {
            warn!(operation, id, code = err.code(), error = %err, "batch item failed");
        }
        outcomes.push(BatchOutcome { id, result });
    }

    let report = BatchReport { outcomes };
    info!(
        operation,
        requested = ids.len(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch finished"
    );
    report
}
