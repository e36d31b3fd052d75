#![forbid(unsafe_code)]

/// Raw record payload as extracted from a submission. Dates are ISO
/// `YYYY-MM-DD` strings or empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordInput {
    pub name: String,
    pub tax_id: String,
    pub action_type: String,
    pub closing_date: String,
    pub pending_notes: String,
    pub process_number: String,
    pub filing_date: String,
    pub remarks: String,
    pub referrer: String,
}

/// Creates a record under an office key that is already registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateRecordRequest {
    pub office_key: String,
    pub input: RecordInput,
}

/// Creates a record from a free-text office label, registering the office
/// when the label is new.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitRecordRequest {
    pub office_label: String,
    pub input: RecordInput,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OfficeTarget {
    /// An already registered key.
    Key(String),
    /// Free text resolved like a submission label.
    Label(String),
}

/// Partial update; `None` leaves the field untouched. Date fields accept an
/// empty string to clear the date.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub action_type: Option<String>,
    pub closing_date: Option<String>,
    pub pending_notes: Option<String>,
    pub process_number: Option<String>,
    pub filing_date: Option<String>,
    pub remarks: Option<String>,
    pub referrer: Option<String>,
    pub office: Option<OfficeTarget>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
