#![forbid(unsafe_code)]

use super::records::{RECORD_COLUMNS, record_from_row};
use super::{SqliteStore, StoreError, count_to_u64, to_sqlite_i64};
use reg_core::{DateRange, FilterSpec, OfficeScope, PageWindow, RecordPage, TextField, TextFilter};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tracing::debug;

/// A conjunction of parameterized predicates over `records`. Column names
/// only ever come from the closed field enums; user text is always bound.
#[derive(Debug, Default)]
struct RecordQuery {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl RecordQuery {
    fn from_filter(filter: &FilterSpec) -> Self {
        let mut query = Self::default();
        if let OfficeScope::Office(key) = &filter.office_scope {
            query.push("office_key = ?", [Value::Text(key.clone())]);
        }
        if let Some(text) = &filter.text {
            query.push_text(text);
        }
        if let Some(range) = &filter.date_range {
            query.push_date_range(range);
        }
        query
    }

    fn push(&mut self, clause: impl Into<String>, params: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.into());
        self.params.extend(params);
    }

    fn push_text(&mut self, text: &TextFilter) {
        let value = text.value.trim();
        match text.field {
            TextField::Name => self.push(
                "instr(fold_case(name), ?) > 0",
                [Value::Text(value.to_lowercase())],
            ),
            TextField::TaxId => {
                self.push("instr(tax_id, ?) > 0", [Value::Text(value.to_string())])
            }
            // Non-numeric ids match nothing instead of failing the listing.
            TextField::Id => match value.parse::<i64>() {
                Ok(id) => self.push("id = ?", [Value::Integer(id)]),
                Err(_) => self.push("0 = 1", Vec::new()),
            },
        }
    }

    fn push_date_range(&mut self, range: &DateRange) {
        let column = range.field.column();
        if let Some(from) = range.from {
            self.push(format!("{column} >= ?"), [Value::Text(from.to_string())]);
        }
        if let Some(to) = range.to {
            self.push(format!("{column} <= ?"), [Value::Text(to.to_string())]);
        }
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

impl SqliteStore {
    /// Filtered, paginated listing of active records, newest id first.
    ///
    /// The total is counted before the page is clamped, so asking for a page
    /// past the end returns the last page rather than an empty one.
    pub fn record_list(&self, filter: &FilterSpec) -> Result<RecordPage, StoreError> {
        let query = RecordQuery::from_filter(filter);
        let where_sql = query.where_sql();

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let total = tx.query_row(
            &format!("SELECT COUNT(1) FROM records{where_sql}"),
            params_from_iter(query.params.iter()),
            |row| row.get::<_, i64>(0),
        )?;
        let window = PageWindow::resolve(filter.page, filter.page_size, count_to_u64(total));

        let mut params = query.params.clone();
        params.push(Value::Integer(i64::from(window.page_size)));
        params.push(Value::Integer(to_sqlite_i64(window.offset())?));

        let rows = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM records{where_sql} ORDER BY id DESC LIMIT ? OFFSET ?"
            ))?;
            let mapped = stmt.query_map(params_from_iter(params.iter()), record_from_row)?;
            let mut rows = Vec::new();
            for row in mapped {
                rows.push(row?);
            }
            rows
        };
        tx.commit()?;

        debug!(
            predicates = query.clauses.len(),
            total_count = window.total_count,
            page = window.page,
            page_size = window.page_size,
            returned = rows.len(),
            "records listed"
        );
        Ok(RecordPage { rows, window })
    }
}
