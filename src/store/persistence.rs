//! Conversion between observation rows and polars frames, and the file I/O
//! behind [`crate::TimeSeriesStore::load`] and [`crate::TimeSeriesStore::save`].

use crate::store::error::{CorruptReason, StoreError};
use crate::types::observation::CachedObservation;
use chrono::{DateTime, NaiveDate, SecondsFormat};
use chrono_tz::Tz;
use polars::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub(crate) const TIME_COLUMN: &str = "time";
pub(crate) const DATE_COLUMN: &str = "date";
pub(crate) const HOUR_COLUMN: &str = "hour";
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// On-disk encoding of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFormat {
    #[default]
    Csv,
    Parquet,
}

impl StoreFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            StoreFormat::Csv => "csv",
            StoreFormat::Parquet => "parquet",
        }
    }

    /// Parquet for `.parquet` files, CSV for everything else.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => StoreFormat::Parquet,
            _ => StoreFormat::Csv,
        }
    }
}

/// Builds the persisted table layout: `time`, `date`, `hour`, then one column per variable.
pub fn observations_to_frame(
    rows: &[CachedObservation],
    columns: &[String],
) -> PolarsResult<DataFrame> {
    let times: Vec<String> = rows
        .iter()
        .map(|r| r.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false))
        .collect();
    let dates: Vec<String> = rows
        .iter()
        .map(|r| r.date.format(DATE_FORMAT).to_string())
        .collect();
    let hours: Vec<i64> = rows.iter().map(|r| i64::from(r.hour)).collect();

    let mut frame_columns = vec![
        Column::from(Series::new(TIME_COLUMN.into(), times)),
        Column::from(Series::new(DATE_COLUMN.into(), dates)),
        Column::from(Series::new(HOUR_COLUMN.into(), hours)),
    ];
    for name in columns {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.value(name)).collect();
        frame_columns.push(Column::from(Series::new(name.as_str().into(), values)));
    }
    DataFrame::new(frame_columns)
}

fn required_column(
    df: &DataFrame,
    name: &str,
    dtype: &DataType,
) -> Result<Column, CorruptReason> {
    let column = df
        .column(name)
        .map_err(|_| CorruptReason::MissingColumn(name.to_string()))?;
    Ok(column.strict_cast(dtype)?)
}

/// Parses a persisted table back into rows. Returns the rows and the value
/// columns found in the table, in table order.
pub fn frame_to_observations(
    df: &DataFrame,
    timezone: Tz,
) -> Result<(Vec<CachedObservation>, Vec<String>), CorruptReason> {
    let time_column = required_column(df, TIME_COLUMN, &DataType::String)?;
    let date_column = required_column(df, DATE_COLUMN, &DataType::String)?;
    let hour_column = required_column(df, HOUR_COLUMN, &DataType::Int64)?;
    let times = time_column.str()?;
    let dates = date_column.str()?;
    let hours = hour_column.i64()?;

    let mut variables: Vec<(String, Column)> = Vec::new();
    for name in df.get_column_names() {
        let name = name.as_str();
        if name == TIME_COLUMN || name == DATE_COLUMN || name == HOUR_COLUMN {
            continue;
        }
        let column = df
            .column(name)?
            .strict_cast(&DataType::Float64)
            .map_err(|_| CorruptReason::InvalidValue {
                row: 0,
                column: name.to_string(),
                value: "non-numeric column".to_string(),
            })?;
        variables.push((name.to_string(), column));
    }

    let mut rows = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let missing = |column: &str| CorruptReason::MissingValue {
            row,
            column: column.to_string(),
        };
        let invalid = |column: &str, value: &str| CorruptReason::InvalidValue {
            row,
            column: column.to_string(),
            value: value.to_string(),
        };

        let time = times.get(row).ok_or_else(|| missing(TIME_COLUMN))?;
        let timestamp = DateTime::parse_from_rfc3339(time)
            .map_err(|_| invalid(TIME_COLUMN, time))?
            .with_timezone(&timezone);
        let date_text = dates.get(row).ok_or_else(|| missing(DATE_COLUMN))?;
        let date = NaiveDate::parse_from_str(date_text, DATE_FORMAT)
            .map_err(|_| invalid(DATE_COLUMN, date_text))?;
        let hour = hours.get(row).ok_or_else(|| missing(HOUR_COLUMN))?;
        let hour = u32::try_from(hour)
            .ok()
            .filter(|h| *h < 24)
            .ok_or_else(|| invalid(HOUR_COLUMN, &hour.to_string()))?;

        let mut values = BTreeMap::new();
        for (name, column) in &variables {
            if let Some(value) = column.f64()?.get(row) {
                values.insert(name.clone(), value);
            }
        }
        rows.push(CachedObservation {
            timestamp,
            date,
            hour,
            values,
        });
    }

    let names = variables.into_iter().map(|(name, _)| name).collect();
    Ok((rows, names))
}

/// Reads the table at `path`. Blocking; call from `spawn_blocking`.
pub(crate) fn read_frame(path: &Path, format: StoreFormat) -> Result<DataFrame, StoreError> {
    let corrupt = |e: PolarsError| StoreError::Corrupt {
        path: path.to_path_buf(),
        source: CorruptReason::Frame(e),
    };
    match format {
        StoreFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(corrupt)?
            .finish()
            .map_err(corrupt),
        StoreFormat::Parquet => {
            let file = std::fs::File::open(path)
                .map_err(|e| StoreError::ReadIo(path.to_path_buf(), e))?;
            ParquetReader::new(file).finish().map_err(corrupt)
        }
    }
}

/// Writes `df` to `path`, replacing any previous content. The table is first
/// written to a temporary file next to `path` and then renamed over it.
/// Blocking; call from `spawn_blocking`.
pub(crate) fn write_frame(
    mut df: DataFrame,
    path: &Path,
    format: StoreFormat,
) -> Result<(), StoreError> {
    let path_buf: PathBuf = path.to_path_buf();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file =
        NamedTempFile::new_in(dir).map_err(|e| StoreError::PersistIo(path_buf.clone(), e))?;

    match format {
        StoreFormat::Csv => {
            CsvWriter::new(temp_file.as_file_mut())
                .include_header(true)
                .finish(&mut df)
                .map_err(|e| StoreError::PersistEncode(path_buf.clone(), e))?;
        }
        StoreFormat::Parquet => {
            ParquetWriter::new(temp_file.as_file_mut())
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| StoreError::PersistEncode(path_buf.clone(), e))?;
        }
    }

    temp_file
        .persist(&path_buf)
        .map_err(|e| StoreError::PersistIo(path_buf.clone(), e.error))?;
    Ok(())
}
