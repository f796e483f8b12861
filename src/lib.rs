mod backfill;
mod columns;
mod config;
mod credentials;
mod error;
mod filtering;
mod normalize;
mod providers;
mod store;
mod types;
mod utils;
mod weather_cache;

#[cfg(test)]
mod test_support;

pub use error::WeatherCacheError;
pub use weather_cache::*;

pub use config::{ConfigError, WeatherConfig};

pub use backfill::orchestrator::BackfillOrchestrator;
pub use backfill::report::{BackfillReport, FailureReason, FetchFailure};

pub use columns::error::ColumnError;
pub use columns::resolver::ColumnNameResolver;

pub use credentials::{
    CredentialError, CredentialStore, KeyringCredentialStore, StaticCredentialStore,
};

pub use filtering::{aggregate_by_date, project, select_rows, FilterError, HourRange};

pub use normalize::daily::representative_timestamp;
pub use normalize::error::NormalizeError;
pub use normalize::hourly::parse_timestamp;
pub use normalize::RecordNormalizer;

pub use providers::aemet::AemetClient;
pub use providers::error::ProviderError;
pub use providers::factory::create_provider;
pub use providers::meteocat::MeteocatClient;
pub use providers::traits::{FetchQuery, ProviderClient};

pub use store::error::{CorruptReason, StoreError};
pub use store::persistence::{frame_to_observations, observations_to_frame, StoreFormat};
pub use store::time_series_store::TimeSeriesStore;

pub use types::aggregation::Aggregation;
pub use types::observation::CachedObservation;
pub use types::payload::RawPayload;
pub use types::provider_kind::{ProviderKind, Resolution};
pub use types::variable::{
    CanonicalVariable, MinMaxPair, VariableDescriptor, VariableTable, AEMET_VARIABLES,
    METEOCAT_VARIABLES,
};
pub use types::weather_table::{DailySummary, WeatherRows, WeatherTable};

pub use utils::{ensure_cache_dir_exists, get_cache_dir};
