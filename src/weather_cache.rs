//! The caller-facing entry point: a locally cached weather time series that
//! fills its own gaps from the configured provider.

use crate::backfill::orchestrator::BackfillOrchestrator;
use crate::backfill::report::BackfillReport;
use crate::columns::resolver::ColumnNameResolver;
use crate::config::WeatherConfig;
use crate::credentials::{CredentialStore, KeyringCredentialStore};
use crate::error::WeatherCacheError;
use crate::filtering::{aggregate_by_date, project, select_rows, HourRange};
use crate::normalize::RecordNormalizer;
use crate::providers::factory::create_provider;
use crate::providers::traits::ProviderClient;
use crate::store::time_series_store::TimeSeriesStore;
use crate::types::aggregation::Aggregation;
use crate::types::payload::RawPayload;
use crate::types::weather_table::{WeatherRows, WeatherTable};
use crate::utils::ensure_cache_dir_exists;
use bon::bon;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use log::info;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Weather observations for one provider station, cached on disk.
///
/// Every query first backfills the requested dates that are not cached yet,
/// then answers from the store. Fetches run concurrently; the store is only
/// touched once all of them have finished, so a timed out or failed batch
/// never leaves half a merge behind.
///
/// # Examples
///
/// ```no_run
/// use fitweather::{Aggregation, ProviderKind, WeatherCache, WeatherCacheError, WeatherConfig};
/// use chrono::NaiveDate;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), WeatherCacheError> {
/// let cache = WeatherCache::new(WeatherConfig::new(ProviderKind::Meteocat)).await?;
///
/// let table = cache
///     .daily_weather()
///     .dates(vec![NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()])
///     .hour_range((8, 12))
///     .aggregate(Aggregation::Mean)
///     .variables(vec!["Temperature".to_string(), "RH".to_string()])
///     .call()
///     .await?;
///
/// println!("{}", table.to_frame()?);
/// # Ok(())
/// # }
/// ```
pub struct WeatherCache {
    store: Arc<Mutex<TimeSeriesStore>>,
    orchestrator: BackfillOrchestrator,
    resolver: ColumnNameResolver,
    timezone: Tz,
    path: PathBuf,
}

#[bon]
impl WeatherCache {
    /// Creates a cache whose API keys come from the system keyring
    /// (service `config.keyring_service`).
    ///
    /// # Errors
    ///
    /// Returns [`WeatherCacheError::Config`] for an invalid configuration,
    /// [`WeatherCacheError::CacheDirCreation`] if the store directory cannot be
    /// created and [`WeatherCacheError::Store`] if an existing store file
    /// cannot be read.
    pub async fn new(config: WeatherConfig) -> Result<Self, WeatherCacheError> {
        let credentials = Arc::new(KeyringCredentialStore::new(config.keyring_service.clone()));
        Self::with_credentials(config, credentials).await
    }

    /// Reads the `WeatherData` section of a YAML settings file.
    pub async fn from_config_file(path: impl AsRef<Path>) -> Result<Self, WeatherCacheError> {
        let config = WeatherConfig::from_file(path).await?;
        Self::new(config).await
    }

    pub async fn with_credentials(
        config: WeatherConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, WeatherCacheError> {
        config.validate()?;
        let provider = create_provider(&config, credentials)?;
        Self::with_provider(&config, provider).await
    }

    /// Uses `provider` instead of the one `config.service` names.
    pub async fn with_provider(
        config: &WeatherConfig,
        provider: Arc<dyn ProviderClient>,
    ) -> Result<Self, WeatherCacheError> {
        config.validate()?;
        let path = config
            .store_path()
            .map_err(WeatherCacheError::CacheDirResolution)?;
        if let Some(dir) = path.parent() {
            ensure_cache_dir_exists(dir)
                .await
                .map_err(|e| WeatherCacheError::CacheDirCreation(dir.to_path_buf(), e))?;
        }

        let variables = provider.variables();
        let mut store = TimeSeriesStore::new(&path, config.timezone, variables.canonical_acronyms());
        store.load().await?;
        info!(
            "Weather cache for {} station {} holds {} dates",
            provider.kind(),
            provider.station(),
            store.cached_dates().len()
        );

        let orchestrator = BackfillOrchestrator::new(
            provider,
            RecordNormalizer::new(config.timezone, config.representative_hour),
        )
        .with_max_concurrency(config.max_concurrency)
        .with_batch_timeout(config.batch_timeout())
        .with_autosave(config.autosave);

        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            orchestrator,
            resolver: ColumnNameResolver::for_table(variables),
            timezone: config.timezone,
            path,
        })
    }

    /// Weather for `dates` (default: today in the configured timezone).
    ///
    /// Missing dates are backfilled first. Rows can be narrowed to an
    /// inclusive local `hour_range` and to `variables` (short or long names).
    /// With `aggregate`, each date's remaining rows are reduced to one summary.
    ///
    /// Hourly rows belong to the UTC day they were fetched for, while `hour`
    /// is their local hour. East of UTC, a date's local midnight row is
    /// therefore the one that opens the next local day, and the first hours
    /// of the local day itself are stored under the previous date. Hour
    /// filters and aggregates follow that grouping.
    ///
    /// # Errors
    ///
    /// Invalid hour ranges ([`WeatherCacheError::Filter`]) and unknown
    /// variables ([`WeatherCacheError::Column`]) are rejected before anything is
    /// fetched. Backfill errors are those of [`WeatherCache::backfill`].
    #[builder]
    pub async fn daily_weather(
        &self,
        dates: Option<Vec<NaiveDate>>,
        hour_range: Option<(u32, u32)>,
        aggregate: Option<Aggregation>,
        variables: Option<Vec<String>>,
    ) -> Result<WeatherTable, WeatherCacheError> {
        let hours = hour_range.map(HourRange::try_from).transpose()?;
        let requested_columns = variables
            .map(|names| self.resolver.resolve_many(names.as_slice()))
            .transpose()?;
        let dates = dates.unwrap_or_else(|| vec![self.today()]);

        self.backfill(&dates).await?;

        let (rows, columns) = {
            let store = self.store.lock().await;
            let selected: BTreeSet<NaiveDate> = dates.iter().copied().collect();
            let columns = requested_columns.unwrap_or_else(|| store.columns());
            (select_rows(store.rows(), &selected, hours), columns)
        };
        let rows = project(rows, &columns);

        let rows = match aggregate {
            Some(aggregation) => WeatherRows::Summaries(aggregate_by_date(&rows, &columns, aggregation)),
            None => WeatherRows::Observations(rows),
        };
        Ok(WeatherTable { columns, rows })
    }

    /// Fetches and merges the dates of `dates` that are not cached yet.
    ///
    /// # Errors
    ///
    /// [`WeatherCacheError::Provider`] when the provider rejects the
    /// credential, [`WeatherCacheError::BackfillTimeout`] when the batch
    /// exceeds `batch_timeout_secs` and [`WeatherCacheError::Store`] when the
    /// autosave fails. Failures of single fetches are only reported.
    pub async fn backfill(&self, dates: &[NaiveDate]) -> Result<BackfillReport, WeatherCacheError> {
        self.orchestrator.backfill(&self.store, dates).await
    }

    pub async fn cached_dates(&self) -> BTreeSet<NaiveDate> {
        self.store.lock().await.cached_dates().clone()
    }

    /// Writes the store to disk. Needed only when autosave is off.
    pub async fn save(&self) -> Result<(), WeatherCacheError> {
        self.store.lock().await.save().await?;
        Ok(())
    }

    /// Metadata the provider publishes about the configured station.
    pub async fn station_metadata(&self) -> Result<RawPayload, WeatherCacheError> {
        Ok(self.orchestrator.provider().station_metadata().await?)
    }

    pub fn resolver(&self) -> &ColumnNameResolver {
        &self.resolver
    }

    pub fn provider(&self) -> &Arc<dyn ProviderClient> {
        self.orchestrator.provider()
    }

    pub fn store_path(&self) -> &Path {
        &self.path
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}
