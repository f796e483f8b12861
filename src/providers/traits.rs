//! The capability every weather provider implements.

use crate::providers::error::ProviderError;
use crate::types::payload::RawPayload;
use crate::types::provider_kind::ProviderKind;
use crate::types::variable::{VariableDescriptor, VariableTable};
use async_trait::async_trait;
use chrono::NaiveDate;

/// One unit of provider work: a date, and for hourly-per-variable providers a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchQuery {
    pub date: NaiveDate,
    pub variable: Option<&'static VariableDescriptor>,
}

impl FetchQuery {
    pub fn daily(date: NaiveDate) -> Self {
        Self {
            date,
            variable: None,
        }
    }

    pub fn variable(date: NaiveDate, variable: &'static VariableDescriptor) -> Self {
        Self {
            date,
            variable: Some(variable),
        }
    }
}

/// A remote weather data source.
///
/// Implementations hold no mutable state besides a memoised credential, so
/// one instance is shared by every concurrent fetch of a backfill.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Station code requests are issued for.
    fn station(&self) -> &str;

    fn variables(&self) -> &'static VariableTable {
        self.kind().variables()
    }

    /// Resolves the credential, failing with [`ProviderError::Auth`] when there is none.
    async fn authenticate(&self) -> Result<(), ProviderError>;

    /// Issues the request for `query` and returns the provider's JSON.
    ///
    /// A provider without data for the query returns an empty payload.
    async fn fetch(&self, query: &FetchQuery) -> Result<RawPayload, ProviderError>;

    /// Metadata the provider publishes about the configured station.
    async fn station_metadata(&self) -> Result<RawPayload, ProviderError>;
}
