use thiserror::Error;

/// Everything that can stop a night's data from being summarised.
#[derive(Debug, Error, PartialEq)]
pub enum SleepError {
    #[error("not enough data for export: {rows} usable row(s), need at least 2")]
    InsufficientData { rows: usize },

    #[error("malformed field in row {row}, column {column}: {value:?}")]
    MalformedField {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("degenerate session: {0}")]
    DegenerateSession(&'static str),

    #[error("invalid time zone {name:?}: {reason}")]
    InvalidTimeZone { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SleepError>;
