#![forbid(unsafe_code)]

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Reserved office that always exists and can never be deleted.
pub const CENTRAL_OFFICE_KEY: &str = "CENTRAL";

/// Listing keyword meaning "every office". No office may be registered
/// under it, or the scope and the key would be indistinguishable.
pub const ALL_OFFICES_KEYWORD: &str = "ALL";

/// Maps a free-text office name onto its canonical storage key.
///
/// The name is trimmed, accent-folded and upper-cased, spaces become `_`,
/// and anything outside `[A-Z0-9_]` is dropped. A name that strips down to
/// nothing maps to [`CENTRAL_OFFICE_KEY`], so the function is total.
///
/// ```
/// assert_eq!(reg_core::normalize_office_key("  São Paulo "), "SAO_PAULO");
/// assert_eq!(reg_core::normalize_office_key("???"), "CENTRAL");
/// ```
pub fn normalize_office_key(name: &str) -> String {
    let key: String = name
        .trim()
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_uppercase)
        .map(|ch| if ch == ' ' { '_' } else { ch })
        .filter(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || *ch == '_')
        .collect();

    if key.is_empty() {
        CENTRAL_OFFICE_KEY.to_string()
    } else {
        key
    }
}

/// Display name used when an office is introduced from a typed label
/// (submission, migration, explicit creation). Keeps accents.
pub fn office_display_from_label(label: &str) -> String {
    label.trim().to_uppercase()
}

pub fn is_canonical_office_key(key: &str) -> bool {
    !key.is_empty() && normalize_office_key(key) == key
}

pub fn is_reserved_office_key(key: &str) -> bool {
    key == ALL_OFFICES_KEYWORD
}

pub fn is_central_office(key: &str) -> bool {
    key == CENTRAL_OFFICE_KEY
}
