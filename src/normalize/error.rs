use chrono::NaiveDate;
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),

    #[error("Invalid number '{value}' for field '{field}'")]
    InvalidNumber { field: String, value: String },

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("{date} {hour:02}:00 does not exist in {timezone}")]
    NonexistentLocalTime {
        date: NaiveDate,
        hour: u32,
        timezone: Tz,
    },
}
