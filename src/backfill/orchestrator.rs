//! Fills the gaps of a [`TimeSeriesStore`] from a provider.
//!
//! Missing dates are split into independent fetch tasks (one per date, or one
//! per date and variable), run on a `JoinSet` under an optional concurrency
//! cap, and joined before anything touches the store. A failed task is
//! recorded in the report and never cancels its siblings.

use crate::backfill::report::{BackfillReport, FailureReason, FetchFailure};
use crate::error::WeatherCacheError;
use crate::normalize::RecordNormalizer;
use crate::providers::traits::{FetchQuery, ProviderClient};
use crate::store::time_series_store::TimeSeriesStore;
use crate::types::observation::CachedObservation;
use crate::types::provider_kind::Resolution;
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

type FetchOutcome = (FetchQuery, Result<Vec<CachedObservation>, FailureReason>);

pub struct BackfillOrchestrator {
    provider: Arc<dyn ProviderClient>,
    normalizer: RecordNormalizer,
    max_concurrency: Option<usize>,
    batch_timeout: Option<Duration>,
    autosave: bool,
}

impl BackfillOrchestrator {
    /// Unbounded, no timeout, no autosave.
    pub fn new(provider: Arc<dyn ProviderClient>, normalizer: RecordNormalizer) -> Self {
        Self {
            provider,
            normalizer,
            max_concurrency: None,
            batch_timeout: None,
            autosave: false,
        }
    }

    /// Caps the number of fetches in flight. `None` spawns all at once.
    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency.filter(|n| *n > 0);
        self
    }

    /// Abandons the whole batch when fetching takes longer than `timeout`.
    pub fn with_batch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.batch_timeout = timeout;
        self
    }

    /// Saves the store after every merge.
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    pub fn provider(&self) -> &Arc<dyn ProviderClient> {
        &self.provider
    }

    fn work_units(&self, missing: &[NaiveDate]) -> Vec<FetchQuery> {
        match self.provider.kind().resolution() {
            Resolution::Daily => missing.iter().map(|d| FetchQuery::daily(*d)).collect(),
            Resolution::HourlyPerVariable => {
                let descriptors = self.provider.variables().descriptors;
                missing
                    .iter()
                    .flat_map(|d| descriptors.iter().map(move |v| FetchQuery::variable(*d, v)))
                    .collect()
            }
        }
    }

    /// Ensures every date in `requested` is cached.
    ///
    /// Per-task failures end up in the report. Errors are returned only for
    /// a rejected credential, a timeout (store untouched) or a failed autosave
    /// (rows merged in memory, safe to save again).
    ///
    /// Missing dates are decided before the store lock is released for the
    /// fetches, so concurrent calls for the same dates each fetch them. The
    /// merge keeps one row per (date, hour), the later batch winning.
    pub async fn backfill(
        &self,
        store: &Mutex<TimeSeriesStore>,
        requested: &[NaiveDate],
    ) -> Result<BackfillReport, WeatherCacheError> {
        let missing = store.lock().await.missing_dates(requested);
        let mut report = BackfillReport::new(requested.len(), missing.clone());
        if missing.is_empty() {
            debug!("All {} requested dates are cached", requested.len());
            return Ok(report);
        }

        self.provider.authenticate().await?;

        let units = self.work_units(&missing);
        report.fetches = units.len();
        info!(
            "Backfilling {} dates from {} station {} ({} fetches)",
            missing.len(),
            self.provider.kind(),
            self.provider.station(),
            units.len()
        );

        let unit_count = units.len();
        let outcomes = match self.batch_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.fetch_all(units))
                .await
                .map_err(|_| {
                    warn!("Backfill abandoned after {:?}, store left unchanged", timeout);
                    WeatherCacheError::BackfillTimeout {
                        units: unit_count,
                        timeout,
                    }
                })?,
            None => self.fetch_all(units).await,
        };

        let rows = self.classify(outcomes, &missing, &mut report);
        if !rows.is_empty() {
            let mut store = store.lock().await;
            report.rows_merged = store.merge(rows);
            if self.autosave {
                store.save().await?;
            }
        }

        info!(
            "Backfill done: {} filled, {} partial, {} failed, {} rows merged",
            report.filled.len(),
            report.partial.len(),
            report.failed.len(),
            report.rows_merged
        );
        Ok(report)
    }

    /// Runs every unit and waits for all of them. Dropping the returned future
    /// drops the `JoinSet`, which aborts the tasks still running.
    async fn fetch_all(&self, units: Vec<FetchQuery>) -> Vec<FetchOutcome> {
        let semaphore = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let mut set = JoinSet::new();
        let mut pending = HashMap::with_capacity(units.len());

        for query in units {
            let provider = Arc::clone(&self.provider);
            let normalizer = self.normalizer;
            let semaphore = semaphore.clone();
            let handle = set.spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => Some(semaphore.acquire_owned().await),
                    None => None,
                };
                fetch_one(provider.as_ref(), normalizer, &query).await
            });
            debug!("Spawned fetch {} for {:?}", handle.id(), query);
            pending.insert(handle.id(), query);
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        while let Some(joined) = set.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(e) => (e.id(), Err(FailureReason::Panicked(e.to_string()))),
            };
            match pending.remove(&id) {
                Some(query) => outcomes.push((query, result)),
                None => error!("Joined unknown fetch task {}", id),
            }
        }
        outcomes
    }

    /// Logs failures, classifies each missing date and combines the
    /// per-variable rows of hourly providers into one row per hour.
    fn classify(
        &self,
        outcomes: Vec<FetchOutcome>,
        missing: &[NaiveDate],
        report: &mut BackfillReport,
    ) -> Vec<CachedObservation> {
        let mut units_per_date: HashMap<NaiveDate, (usize, usize)> = HashMap::new();
        let mut combined: BTreeMap<(NaiveDate, u32), CachedObservation> = BTreeMap::new();

        for (query, result) in outcomes {
            let counts = units_per_date.entry(query.date).or_insert((0, 0));
            counts.0 += 1;
            match result {
                Ok(rows) => {
                    counts.1 += 1;
                    for row in rows {
                        match combined.entry(row.key()) {
                            Entry::Occupied(mut existing) => existing.get_mut().merge_from(&row),
                            Entry::Vacant(slot) => {
                                slot.insert(row);
                            }
                        }
                    }
                }
                Err(reason) => {
                    let variable = query.variable.map(|v| v.acronym);
                    warn!(
                        "Skipping {} station {} date {} variable {}: {}",
                        self.provider.kind(),
                        self.provider.station(),
                        query.date,
                        variable.unwrap_or("all"),
                        reason
                    );
                    report.failures.push(FetchFailure {
                        date: query.date,
                        variable,
                        reason,
                    });
                }
            }
        }

        let columns = self.provider.variables().canonical_acronyms();
        for date in missing {
            let (units, succeeded) = units_per_date.get(date).copied().unwrap_or((0, 0));
            let complete_rows = combined
                .range((*date, 0)..=(*date, u32::MAX))
                .all(|(_, row)| columns.iter().all(|c| row.values.contains_key(c)));
            if succeeded == 0 {
                report.failed.push(*date);
            } else if succeeded == units && complete_rows {
                report.filled.push(*date);
            } else {
                report.partial.push(*date);
            }
        }

        combined.into_values().collect()
    }
}

async fn fetch_one(
    provider: &dyn ProviderClient,
    normalizer: RecordNormalizer,
    query: &FetchQuery,
) -> Result<Vec<CachedObservation>, FailureReason> {
    let payload = provider.fetch(query).await?;
    let rows = normalizer.normalize(
        provider.kind().resolution(),
        provider.variables(),
        &payload,
        query.date,
        query.variable,
    )?;
    if rows.is_empty() {
        return Err(FailureReason::NoData);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::error::ProviderError;
    use crate::test_support::{aemet_record, meteocat_readings, FakeProvider};
    use crate::types::provider_kind::ProviderKind;
    use chrono_tz::Europe::Madrid;
    use chrono_tz::Tz;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, d).unwrap()
    }

    fn store(dir: &tempfile::TempDir, kind: ProviderKind) -> Mutex<TimeSeriesStore> {
        Mutex::new(TimeSeriesStore::new(
            dir.path().join("weather.csv"),
            Madrid,
            kind.variables().canonical_acronyms(),
        ))
    }

    fn orchestrator(provider: Arc<FakeProvider>, tz: Tz) -> BackfillOrchestrator {
        BackfillOrchestrator::new(provider, RecordNormalizer::new(tz, 12))
    }

    #[tokio::test]
    async fn second_backfill_fetches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, ProviderKind::Aemet);
        let provider = Arc::new(
            FakeProvider::daily()
                .with_payload(day(1), None, aemet_record(day(1), 10.0, 20.0))
                .with_payload(day(2), None, aemet_record(day(2), 11.0, 21.0)),
        );
        let orchestrator = orchestrator(provider.clone(), Madrid);

        let first = orchestrator.backfill(&store, &[day(1), day(2)]).await.unwrap();
        assert_eq!(first.fetches, 2);
        assert_eq!(first.rows_merged, 2);
        assert_eq!(provider.fetch_count(), 2);

        let second = orchestrator.backfill(&store, &[day(2), day(1)]).await.unwrap();
        assert!(second.is_noop());
        assert_eq!(provider.fetch_count(), 2);

        let store = store.lock().await;
        assert_eq!(store.rows()[0].value("T"), Some(15.0));
    }

    #[tokio::test]
    async fn concurrent_backfills_of_one_date_merge_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, ProviderKind::Aemet);
        let provider = Arc::new(
            FakeProvider::daily()
                .with_payload(day(1), None, aemet_record(day(1), 10.0, 20.0))
                .with_delay(Duration::from_millis(50)),
        );
        let orchestrator = orchestrator(provider.clone(), Madrid);

        let dates = [day(1)];
        let (a, b) = tokio::join!(
            orchestrator.backfill(&store, &dates),
            orchestrator.backfill(&store, &dates)
        );
        assert_eq!(a.unwrap().missing, vec![day(1)]);
        assert_eq!(b.unwrap().missing, vec![day(1)]);
        assert_eq!(provider.fetch_count(), 2);

        let store = store.lock().await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.rows()[0].value("T"), Some(15.0));
    }

    #[tokio::test]
    async fn one_failed_date_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, ProviderKind::Aemet);
        let provider = Arc::new(
            FakeProvider::daily()
                .with_transport_error(day(1), None)
                .with_payload(day(2), None, aemet_record(day(2), 10.0, 20.0)),
        );

        let report = orchestrator(provider, Madrid)
            .backfill(&store, &[day(1), day(2)])
            .await
            .unwrap();
        assert_eq!(report.failed, vec![day(1)]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].reason,
            FailureReason::Provider(ProviderError::Transport { .. })
        ));

        let store = store.lock().await;
        assert!(store.cached_dates().contains(&day(2)));
        assert!(!store.cached_dates().contains(&day(1)));
    }

    #[tokio::test]
    async fn upstream_error_and_no_data_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, ProviderKind::Aemet);
        let provider = Arc::new(FakeProvider::daily().with_status(day(1), None, 500));

        let report = orchestrator(provider, Madrid)
            .backfill(&store, &[day(1), day(2)])
            .await
            .unwrap();
        assert_eq!(report.failed, vec![day(1), day(2)]);
        let statuses: Vec<_> = report
            .failures
            .iter()
            .map(|f| match &f.reason {
                FailureReason::Provider(e) => e.status(),
                _ => None,
            })
            .collect();
        assert!(statuses.contains(&Some(500)));
        assert!(report
            .failures_for(day(2))
            .any(|f| matches!(f.reason, FailureReason::NoData)));
        assert_eq!(report.rows_merged, 0);
    }

    #[tokio::test]
    async fn missing_hourly_variable_is_partial() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, ProviderKind::Meteocat);
        // Hours are UTC; Madrid is UTC+1 in January.
        let provider = Arc::new(
            FakeProvider::hourly()
                .with_payload(day(1), Some("32"), meteocat_readings(day(1), &[(12, 9.0), (13, 10.0)]))
                .with_payload(day(1), Some("33"), meteocat_readings(day(1), &[(12, 80.0)]))
                .with_payload(day(1), Some("34"), meteocat_readings(day(1), &[(12, 1015.0), (13, 1014.0)]))
                .with_payload(day(1), Some("35"), meteocat_readings(day(1), &[(12, 0.0), (13, 0.2)])),
        );

        let report = orchestrator(provider.clone(), Madrid)
            .backfill(&store, &[day(1)])
            .await
            .unwrap();
        assert_eq!(provider.fetch_count(), 4);
        assert_eq!(report.partial, vec![day(1)]);
        assert!(report.failures.is_empty());

        let store = store.lock().await;
        assert_eq!(store.len(), 2);
        let at_14 = store.rows().iter().find(|r| r.hour == 14).unwrap();
        assert_eq!(at_14.value("T"), Some(10.0));
        assert_eq!(at_14.value("RH"), None);
        let at_13 = store.rows().iter().find(|r| r.hour == 13).unwrap();
        assert_eq!(at_13.value("RH"), Some(80.0));
    }

    #[tokio::test]
    async fn timeout_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, ProviderKind::Aemet);
        let provider = Arc::new(
            FakeProvider::daily()
                .with_payload(day(1), None, aemet_record(day(1), 10.0, 20.0))
                .with_delay(Duration::from_secs(5)),
        );

        let err = orchestrator(provider, Madrid)
            .with_batch_timeout(Some(Duration::from_millis(50)))
            .backfill(&store, &[day(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherCacheError::BackfillTimeout { .. }));
        let store = store.lock().await;
        assert!(store.cached_dates().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn concurrency_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, ProviderKind::Aemet);
        let dates: Vec<_> = (1..=12).map(day).collect();
        let mut provider = FakeProvider::daily().with_delay(Duration::from_millis(20));
        for date in &dates {
            provider = provider.with_payload(*date, None, aemet_record(*date, 1.0, 3.0));
        }
        let provider = Arc::new(provider);

        let report = orchestrator(provider.clone(), Madrid)
            .with_max_concurrency(Some(3))
            .backfill(&store, &dates)
            .await
            .unwrap();
        assert_eq!(report.rows_merged, 12);
        assert!(provider.max_in_flight() <= 3);
        assert!(provider.max_in_flight() >= 1);
    }

    #[tokio::test]
    async fn rejected_credential_stops_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, ProviderKind::Aemet);
        let provider = Arc::new(FakeProvider::daily().failing_auth());

        let err = orchestrator(provider.clone(), Madrid)
            .backfill(&store, &[day(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherCacheError::Provider(ref e) if e.is_auth()));
        assert_eq!(provider.fetch_count(), 0);
    }

    #[tokio::test]
    async fn autosave_writes_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, ProviderKind::Aemet);
        let provider =
            Arc::new(FakeProvider::daily().with_payload(day(1), None, aemet_record(day(1), 10.0, 20.0)));

        orchestrator(provider, Madrid)
            .with_autosave(true)
            .backfill(&store, &[day(1)])
            .await
            .unwrap();
        assert!(dir.path().join("weather.csv").exists());
    }
}
