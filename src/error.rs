use crate::columns::error::ColumnError;
use crate::config::ConfigError;
use crate::filtering::FilterError;
use crate::providers::error::ProviderError;
use crate::store::error::StoreError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherCacheError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Column(#[from] ColumnError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Backfill of {units} fetches did not finish within {timeout:?}")]
    BackfillTimeout { units: usize, timeout: Duration },

    #[error("Failed to build result frame")]
    Frame(#[from] polars::prelude::PolarsError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),
}
