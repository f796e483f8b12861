use crate::normalize::error::NormalizeError;
use crate::providers::error::ProviderError;
use chrono::NaiveDate;
use thiserror::Error;

/// Why a single fetch contributed nothing to the merge.
#[derive(Debug, Error)]
pub enum FailureReason {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Malformed payload: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Provider returned no data")]
    NoData,

    #[error("Fetch task panicked: {0}")]
    Panicked(String),
}

#[derive(Debug)]
pub struct FetchFailure {
    pub date: NaiveDate,
    /// Acronym of the variable, for hourly-per-variable providers.
    pub variable: Option<&'static str>,
    pub reason: FailureReason,
}

/// Outcome of one backfill call.
#[derive(Debug, Default)]
pub struct BackfillReport {
    /// Number of dates the caller asked for.
    pub requested: usize,
    /// Dates that were not cached when the call started.
    pub missing: Vec<NaiveDate>,
    /// Fetch tasks spawned.
    pub fetches: usize,
    /// Every fetch succeeded and every row carries every variable.
    pub filled: Vec<NaiveDate>,
    /// Some data arrived but some fetches failed or some values are null.
    pub partial: Vec<NaiveDate>,
    /// Nothing arrived for the date.
    pub failed: Vec<NaiveDate>,
    pub failures: Vec<FetchFailure>,
    pub rows_merged: usize,
}

impl BackfillReport {
    pub(crate) fn new(requested: usize, missing: Vec<NaiveDate>) -> Self {
        Self {
            requested,
            missing,
            ..Self::default()
        }
    }

    /// True when everything requested was already cached.
    pub fn is_noop(&self) -> bool {
        self.fetches == 0
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures_for(&self, date: NaiveDate) -> impl Iterator<Item = &FetchFailure> {
        self.failures.iter().filter(move |f| f.date == date)
    }
}
