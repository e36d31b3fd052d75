#![forbid(unsafe_code)]

use crate::model::{IsoDate, IsoDateError, Record};
use crate::office_key::{ALL_OFFICES_KEYWORD, normalize_office_key};
use serde::Serialize;
use std::fmt;

pub const ALLOWED_PAGE_SIZES: [u32; 4] = [10, 20, 50, 100];
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Any size outside [`ALLOWED_PAGE_SIZES`] falls back to the default.
pub fn snap_page_size(requested: u32) -> u32 {
    if ALLOWED_PAGE_SIZES.contains(&requested) {
        requested
    } else {
        DEFAULT_PAGE_SIZE
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OfficeScope {
    #[default]
    All,
    Office(String),
}

impl OfficeScope {
    /// `ALL` (any casing) selects every office; other text is normalized into a key.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(ALL_OFFICES_KEYWORD) {
            Self::All
        } else {
            Self::Office(normalize_office_key(raw))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextField {
    Name,
    TaxId,
    Id,
}

impl TextField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "name" => Some(Self::Name),
            "tax_id" => Some(Self::TaxId),
            "id" => Some(Self::Id),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::TaxId => "tax_id",
            Self::Id => "id",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateField {
    ClosingDate,
    FilingDate,
}

impl DateField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "closing_date" => Some(Self::ClosingDate),
            "filing_date" => Some(Self::FilingDate),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::ClosingDate => "closing_date",
            Self::FilingDate => "filing_date",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextFilter {
    pub field: TextField,
    pub value: String,
}

/// Inclusive on both ends; either end may be open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub field: DateField,
    pub from: Option<IsoDate>,
    pub to: Option<IsoDate>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterSpec {
    pub office_scope: OfficeScope,
    pub text: Option<TextFilter>,
    pub date_range: Option<DateRange>,
    pub page: u64,
    pub page_size: u32,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            office_scope: OfficeScope::All,
            text: None,
            date_range: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Raw listing parameters as they arrive from a form or command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterParams<'a> {
    pub office: Option<&'a str>,
    pub text_field: Option<&'a str>,
    pub text_value: Option<&'a str>,
    pub date_field: Option<&'a str>,
    pub date_from: Option<&'a str>,
    pub date_to: Option<&'a str>,
    /// Signed so that nonsense like `-1` clamps instead of failing.
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterError {
    UnknownTextField,
    UnknownDateField,
    InvalidDate(IsoDateError),
}

impl FilterError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownTextField => "text field must be one of name, tax_id, id",
            Self::UnknownDateField => "date field must be one of closing_date, filing_date",
            Self::InvalidDate(err) => err.message(),
        }
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for FilterError {}

impl FilterSpec {
    /// Builds a filter from raw parameters. A blank text value drops the text
    /// predicate, and a date field with neither bound drops the date predicate.
    pub fn from_params(params: &FilterParams<'_>) -> Result<Self, FilterError> {
        let office_scope = params
            .office
            .filter(|raw| !raw.trim().is_empty())
            .map(OfficeScope::parse)
            .unwrap_or_default();

        let text_value = params.text_value.map(str::trim).unwrap_or("");
        let text = match params.text_field.filter(|raw| !raw.trim().is_empty()) {
            Some(raw) => {
                let field = TextField::parse(raw).ok_or(FilterError::UnknownTextField)?;
                (!text_value.is_empty()).then(|| TextFilter {
                    field,
                    value: text_value.to_string(),
                })
            }
            None => None,
        };

        let date_range = match params.date_field.filter(|raw| !raw.trim().is_empty()) {
            Some(raw) => {
                let field = DateField::parse(raw).ok_or(FilterError::UnknownDateField)?;
                let from = IsoDate::parse_optional(params.date_from.unwrap_or(""))
                    .map_err(FilterError::InvalidDate)?;
                let to = IsoDate::parse_optional(params.date_to.unwrap_or(""))
                    .map_err(FilterError::InvalidDate)?;
                (from.is_some() || to.is_some()).then_some(DateRange { field, from, to })
            }
            None => None,
        };

        Ok(Self {
            office_scope,
            text,
            date_range,
            page: params
                .page
                .and_then(|page| u64::try_from(page).ok())
                .map_or(1, |page| page.max(1)),
            page_size: params
                .page_size
                .and_then(|size| u32::try_from(size).ok())
                .map_or(DEFAULT_PAGE_SIZE, snap_page_size),
        })
    }
}

/// Resolved pagination window for one listing call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: u64,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl PageWindow {
    /// Snaps the page size and clamps the page into `[1, total_pages]`.
    /// An empty result set still reports one page.
    pub fn resolve(requested_page: u64, requested_page_size: u32, total_count: u64) -> Self {
        let page_size = snap_page_size(requested_page_size);
        let total_pages = total_count.div_ceil(u64::from(page_size)).max(1);
        let page = requested_page.clamp(1, total_pages);
        Self {
            page,
            page_size,
            total_count,
            total_pages,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(u64::from(self.page_size))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordPage {
    pub rows: Vec<Record>,
    #[serde(flatten)]
    pub window: PageWindow,
}
