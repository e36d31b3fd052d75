#![forbid(unsafe_code)]

use serde::{Serialize, Serializer};
use std::fmt;
use time::Date;
use time::macros::format_description;

/// Referrer recorded when a submission leaves the field blank.
pub const DEFAULT_REFERRER: &str = "NÃO PAGO";

/// A calendar date that round-trips through storage as `YYYY-MM-DD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoDate(Date);

impl IsoDate {
    pub fn parse(value: &str) -> Result<Self, IsoDateError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(IsoDateError::Empty);
        }
        if value.len() != 10 {
            return Err(IsoDateError::Malformed);
        }
        Date::parse(value, format_description!("[year]-[month]-[day]"))
            .map(Self)
            .map_err(|_| IsoDateError::Malformed)
    }

    /// Empty input means "no date"; anything else must parse.
    pub fn parse_optional(value: &str) -> Result<Option<Self>, IsoDateError> {
        if value.trim().is_empty() {
            Ok(None)
        } else {
            Self::parse(value).map(Some)
        }
    }

    pub fn date(&self) -> Date {
        self.0
    }
}

impl From<Date> for IsoDate {
    fn from(value: Date) -> Self {
        Self(value)
    }
}

impl fmt::Display for IsoDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl Serialize for IsoDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IsoDateError {
    Empty,
    Malformed,
}

impl IsoDateError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "date must not be empty",
            Self::Malformed => "date must be formatted as YYYY-MM-DD",
        }
    }
}

impl fmt::Display for IsoDateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for IsoDateError {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Office {
    pub key: String,
    pub display_name: String,
}

/// The client payload shared by active records and quarantine entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecordFields {
    pub name: String,
    pub tax_id: String,
    pub action_type: String,
    pub closing_date: Option<IsoDate>,
    pub pending_notes: String,
    pub process_number: String,
    pub filing_date: Option<IsoDate>,
    pub remarks: String,
    pub referrer: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: i64,
    pub office_key: String,
    /// Copy of the office display name as of the last write to this record.
    pub office_display: String,
    #[serde(flatten)]
    pub fields: RecordFields,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuarantineEntry {
    pub id: i64,
    pub origin_office_key: String,
    pub origin_office_display: String,
    #[serde(flatten)]
    pub fields: RecordFields,
    pub created_at_ms: i64,
    pub deleted_at_ms: i64,
}
