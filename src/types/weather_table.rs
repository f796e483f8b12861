use crate::store::persistence::{observations_to_frame, DATE_COLUMN, DATE_FORMAT};
use crate::types::observation::CachedObservation;
use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame, NamedFrom, PolarsResult, Series};
use std::collections::BTreeMap;

/// Result of reducing all selected rows of one date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    /// Number of rows that went into the reduction.
    pub observations: usize,
    pub values: BTreeMap<String, f64>,
}

impl DailySummary {
    pub fn value(&self, acronym: &str) -> Option<f64> {
        self.values.get(acronym).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherRows {
    Observations(Vec<CachedObservation>),
    Summaries(Vec<DailySummary>),
}

/// Rows returned by a weather query together with the value columns they expose.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherTable {
    pub columns: Vec<String>,
    pub rows: WeatherRows,
}

impl WeatherTable {
    pub fn len(&self) -> usize {
        match &self.rows {
            WeatherRows::Observations(rows) => rows.len(),
            WeatherRows::Summaries(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn observations(&self) -> Option<&[CachedObservation]> {
        match &self.rows {
            WeatherRows::Observations(rows) => Some(rows),
            WeatherRows::Summaries(_) => None,
        }
    }

    pub fn summaries(&self) -> Option<&[DailySummary]> {
        match &self.rows {
            WeatherRows::Summaries(rows) => Some(rows),
            WeatherRows::Observations(_) => None,
        }
    }

    /// Converts the table into a polars `DataFrame` with one column per value column.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        match &self.rows {
            WeatherRows::Observations(rows) => observations_to_frame(rows, &self.columns),
            WeatherRows::Summaries(rows) => summaries_to_frame(rows, &self.columns),
        }
    }
}

fn summaries_to_frame(rows: &[DailySummary], columns: &[String]) -> PolarsResult<DataFrame> {
    let dates: Vec<String> = rows
        .iter()
        .map(|r| r.date.format(DATE_FORMAT).to_string())
        .collect();
    let counts: Vec<i64> = rows.iter().map(|r| r.observations as i64).collect();

    let mut frame_columns = vec![
        Column::from(Series::new(DATE_COLUMN.into(), dates)),
        Column::from(Series::new("observations".into(), counts)),
    ];
    for name in columns {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.value(name)).collect();
        frame_columns.push(Column::from(Series::new(name.as_str().into(), values)));
    }
    DataFrame::new(frame_columns)
}
