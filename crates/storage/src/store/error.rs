#![forbid(unsafe_code)]

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    UnknownRecord(i64),
    UnknownQuarantineEntry(i64),
    UnknownOffice(String),
    ProtectedOffice,
    OfficeAlreadyExists(String),
}

impl StoreError {
    /// Stable machine-readable code for the calling layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::Sql(_) => "STORAGE",
            Self::InvalidInput(message) if message.starts_with("RESET_REQUIRED") => {
                "RESET_REQUIRED"
            }
            Self::InvalidInput(_) => "VALIDATION",
            Self::UnknownRecord(_) | Self::UnknownQuarantineEntry(_) | Self::UnknownOffice(_) => {
                "NOT_FOUND"
            }
            Self::ProtectedOffice => "PROTECTED_KEY",
            Self::OfficeAlreadyExists(_) => "CONFLICT",
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == "NOT_FOUND"
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::UnknownRecord(id) => write!(f, "unknown record (id={id})"),
            Self::UnknownQuarantineEntry(id) => {
                write!(f, "unknown quarantine entry (id={id})")
            }
            Self::UnknownOffice(key) => write!(f, "unknown office (key={key})"),
            Self::ProtectedOffice => write!(f, "the CENTRAL office cannot be deleted"),
            Self::OfficeAlreadyExists(key) => write!(f, "office already exists (key={key})"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Sql(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}
