use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FiscalLedgerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Inconsistent inputs: {0}")]
    Inconsistency(String),

    #[error("Cannot parse bucket label '{label}': {reason}")]
    Parse { label: String, reason: String },

    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    #[error("Buckets not assigned to any group: {}", .0.join(", "))]
    MissingAssignment(Vec<String>),

    #[error("Bucket '{bucket}' is assigned to both '{first_group}' and '{second_group}'")]
    DuplicateAssignment {
        bucket: String,
        first_group: String,
        second_group: String,
    },

    #[error("No fiscal year contains {0}")]
    NotFound(NaiveDate),

    #[error("Offset {offset} is outside the calendar window [{min}, {max}]")]
    OffsetOutOfRange { offset: i32, min: i32, max: i32 },

    #[error("Date {date} is outside the calendar window {first} to {last}")]
    DateOutsideWindow {
        date: NaiveDate,
        first: NaiveDate,
        last: NaiveDate,
    },

    #[error("Buckets '{first}' and '{second}' overlap")]
    OverlappingBuckets { first: String, second: String },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column '{column}' holds '{value}', expected {expected}")]
    InvalidField {
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse error categories callers can match on without caring about the
/// variant payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Inconsistency,
    Parse,
    Key,
    MissingAssignment,
    DuplicateAssignment,
    NotFound,
    Input,
    Io,
}

impl FiscalLedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::OffsetOutOfRange { .. } => ErrorKind::Configuration,
            Self::Inconsistency(_) | Self::OverlappingBuckets { .. } => ErrorKind::Inconsistency,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::UnknownBucket(_) => ErrorKind::Key,
            Self::MissingAssignment(_) => ErrorKind::MissingAssignment,
            Self::DuplicateAssignment { .. } => ErrorKind::DuplicateAssignment,
            Self::NotFound(_) | Self::DateOutsideWindow { .. } => ErrorKind::NotFound,
            Self::MissingColumn(_) | Self::InvalidField { .. } | Self::SerializationError(_) => {
                ErrorKind::Input
            }
            Self::CsvError(_) | Self::IoError(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn parse(label: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FiscalLedgerError>;
