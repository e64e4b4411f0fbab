#![forbid(unsafe_code)]

//! Errors raised while loading a transition table.

/// What was wrong with a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableErrorKind {
    /// The input is not valid JSON or does not fit the schema.
    Json,
    /// A transition or family names a state the table does not define.
    UnknownState,
    /// A state belongs to a family the table does not define.
    UnknownFamily,
    /// Two states share a name.
    DuplicateState,
    /// A pattern is empty, does not compile, or captures a missing group.
    BadPattern,
    /// The table defines no states.
    Empty,
    /// The table file could not be read.
    Io,
}

impl TableErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::UnknownState => "unknown state",
            Self::UnknownFamily => "unknown family",
            Self::DuplicateState => "duplicate state",
            Self::BadPattern => "bad pattern",
            Self::Empty => "empty table",
            Self::Io => "io",
        }
    }
}

/// Error for a table that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableError {
    pub kind: TableErrorKind,
    pub message: String,
}

impl TableError {
    pub fn new(kind: TableErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid udl table ({}): {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for TableError {}

impl From<serde_json::Error> for TableError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(TableErrorKind::Json, err.to_string())
    }
}

impl From<std::io::Error> for TableError {
    fn from(err: std::io::Error) -> Self {
        Self::new(TableErrorKind::Io, err.to_string())
    }
}
