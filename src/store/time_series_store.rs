use crate::store::error::StoreError;
use crate::store::persistence::{
    frame_to_observations, observations_to_frame, read_frame, write_frame, StoreFormat,
};
use crate::types::observation::CachedObservation;
use chrono::NaiveDate;
use chrono_tz::Tz;
use log::{debug, info};
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::{fs, task};

/// The merged, deduplicated and chronologically sorted weather table of one
/// station, mirrored to a single file.
///
/// The store is the only writer of its rows. Callers sharing it between tasks
/// wrap it in a `tokio::sync::Mutex` so that `merge` and `save` never
/// interleave with each other or with reads.
#[derive(Debug)]
pub struct TimeSeriesStore {
    path: PathBuf,
    format: StoreFormat,
    timezone: Tz,
    columns: Vec<String>,
    rows: Vec<CachedObservation>,
    cached_dates: BTreeSet<NaiveDate>,
}

impl TimeSeriesStore {
    /// Creates an empty store. `columns` are the value columns always written,
    /// even when every row lacks them.
    pub fn new(path: impl Into<PathBuf>, timezone: Tz, columns: Vec<String>) -> Self {
        let path = path.into();
        Self {
            format: StoreFormat::from_path(&path),
            path,
            timezone,
            columns,
            rows: Vec::new(),
            cached_dates: BTreeSet::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn rows(&self) -> &[CachedObservation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Dates with at least one row.
    pub fn cached_dates(&self) -> &BTreeSet<NaiveDate> {
        &self.cached_dates
    }

    /// The requested dates that are not cached, sorted and without duplicates.
    pub fn missing_dates(&self, requested: &[NaiveDate]) -> Vec<NaiveDate> {
        requested
            .iter()
            .filter(|d| !self.cached_dates.contains(d))
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Value columns in persisted order: the configured ones, then any others seen in rows.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.columns.clone();
        let extra: BTreeSet<&String> = self
            .rows
            .iter()
            .flat_map(|r| r.values.keys())
            .filter(|k| !self.columns.contains(k))
            .collect();
        columns.extend(extra.into_iter().cloned());
        columns
    }

    /// Populates the store from its file. A missing file leaves the store empty;
    /// any other failure to reach it is a [`StoreError::ReadIo`].
    pub async fn load(&mut self) -> Result<(), StoreError> {
        match fs::metadata(&self.path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "No weather store at {:?} yet, starting empty",
                    self.path
                );
                return Ok(());
            }
            Err(e) => return Err(StoreError::ReadIo(self.path.clone(), e)),
        }

        let path = self.path.clone();
        let format = self.format;
        let timezone = self.timezone;
        let (rows, columns) = task::spawn_blocking(move || {
            let df = read_frame(&path, format)?;
            frame_to_observations(&df, timezone).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })
        })
        .await??;

        for column in columns {
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
        self.rows.clear();
        self.merge(rows);
        info!(
            "Loaded {} weather rows covering {} dates from {:?}",
            self.rows.len(),
            self.cached_dates.len(),
            self.path
        );
        Ok(())
    }

    /// Adds `new_rows`, replacing existing rows with the same (date, hour), then
    /// re-sorts by timestamp and recomputes the cached dates. Returns the number
    /// of rows that were not present before.
    pub fn merge(&mut self, new_rows: Vec<CachedObservation>) -> usize {
        let before = self.rows.len();
        let mut index: HashMap<(NaiveDate, u32), usize> = HashMap::with_capacity(before);
        let mut merged: Vec<CachedObservation> = Vec::with_capacity(before + new_rows.len());

        for row in std::mem::take(&mut self.rows).into_iter().chain(new_rows) {
            match index.entry(row.key()) {
                Entry::Occupied(entry) => merged[*entry.get()] = row,
                Entry::Vacant(entry) => {
                    entry.insert(merged.len());
                    merged.push(row);
                }
            }
        }

        merged.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.date.cmp(&b.date))
                .then(a.hour.cmp(&b.hour))
        });
        self.cached_dates = merged.iter().map(|r| r.date).collect();
        self.rows = merged;

        let added = self.rows.len() - before;
        debug!("Merged {} new weather rows into {:?}", added, self.path);
        added
    }

    /// Writes every row to the store file, replacing its previous content.
    /// On failure the in-memory rows are untouched and the call can be retried.
    pub async fn save(&self) -> Result<(), StoreError> {
        let df = observations_to_frame(&self.rows, &self.columns())
            .map_err(|e| StoreError::PersistEncode(self.path.clone(), e))?;
        let path = self.path.clone();
        let format = self.format;
        task::spawn_blocking(move || write_frame(df, &path, format)).await??;
        info!("Saved {} weather rows to {:?}", self.rows.len(), self.path);
        Ok(())
    }
}
