use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a persisted store could not be turned back into observations.
#[derive(Debug, Error)]
pub enum CorruptReason {
    #[error("Unreadable table")]
    Frame(#[from] PolarsError),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Row {row}: missing value in column '{column}'")]
    MissingValue { row: usize, column: String },

    #[error("Row {row}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Weather store '{path}' is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: CorruptReason,
    },

    #[error("Failed to read weather store '{0}'")]
    ReadIo(PathBuf, #[source] std::io::Error),

    // Errors during writing (inside blocking task)
    #[error("I/O error writing weather store '{0}'")]
    PersistIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing weather store '{0}'")]
    PersistEncode(PathBuf, #[source] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// True for failures of `save()`, after which the in-memory store is still intact.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            StoreError::PersistIo(..) | StoreError::PersistEncode(..)
        )
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}
