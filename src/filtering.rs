//! Selection and per-date reduction of cached rows.

use crate::types::aggregation::Aggregation;
use crate::types::observation::CachedObservation;
use crate::types::weather_table::DailySummary;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid hour range: start {start} is after end {end}")]
    InvalidRange { start: u32, end: u32 },

    #[error("Hour {0} is outside 0-23")]
    HourOutOfRange(u32),
}

/// Inclusive range of local hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourRange {
    start: u32,
    end: u32,
}

impl HourRange {
    pub fn new(start: u32, end: u32) -> Result<Self, FilterError> {
        for hour in [start, end] {
            if hour > 23 {
                return Err(FilterError::HourOutOfRange(hour));
            }
        }
        if start > end {
            return Err(FilterError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn contains(&self, hour: u32) -> bool {
        self.start <= hour && hour <= self.end
    }
}

impl TryFrom<(u32, u32)> for HourRange {
    type Error = FilterError;

    fn try_from((start, end): (u32, u32)) -> Result<Self, Self::Error> {
        Self::new(start, end)
    }
}

/// Rows whose date is in `dates` and, when given, whose hour is in `hours`.
/// Input order is kept.
pub fn select_rows(
    rows: &[CachedObservation],
    dates: &BTreeSet<NaiveDate>,
    hours: Option<HourRange>,
) -> Vec<CachedObservation> {
    rows.iter()
        .filter(|row| dates.contains(&row.date))
        .filter(|row| hours.map_or(true, |range| range.contains(row.hour)))
        .cloned()
        .collect()
}

/// Drops every value whose acronym is not in `columns`.
pub fn project(mut rows: Vec<CachedObservation>, columns: &[String]) -> Vec<CachedObservation> {
    for row in &mut rows {
        row.values.retain(|acronym, _| columns.contains(acronym));
    }
    rows
}

/// Groups rows by date and reduces each column's non-null values.
pub fn aggregate_by_date(
    rows: &[CachedObservation],
    columns: &[String],
    aggregation: Aggregation,
) -> Vec<DailySummary> {
    let mut groups: BTreeMap<NaiveDate, Vec<&CachedObservation>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.date).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(date, group)| {
            let values = columns
                .iter()
                .filter_map(|column| {
                    let present: Vec<f64> = group.iter().filter_map(|r| r.value(column)).collect();
                    aggregation
                        .apply(&present)
                        .map(|value| (column.clone(), value))
                })
                .collect();
            DailySummary {
                date,
                observations: group.len(),
                values,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Madrid;

    fn row(day: u32, hour: u32, t: Option<f64>) -> CachedObservation {
        let ts = Madrid.with_ymd_and_hms(2022, 1, day, hour, 0, 0).unwrap();
        let row = CachedObservation::new(ts, ts.date_naive()).with_value("RH", 50.0);
        match t {
            Some(t) => row.with_value("T", t),
            None => row,
        }
    }

    fn columns() -> Vec<String> {
        vec!["T".to_string(), "RH".to_string()]
    }

    #[test]
    fn hour_range_validation() {
        assert_eq!(
            HourRange::new(18, 6).unwrap_err(),
            FilterError::InvalidRange { start: 18, end: 6 }
        );
        assert_eq!(
            HourRange::try_from((0, 24)).unwrap_err(),
            FilterError::HourOutOfRange(24)
        );
        let range = HourRange::new(8, 8).unwrap();
        assert!(range.contains(8));
        assert!(!range.contains(9));
    }

    #[test]
    fn selects_by_date_and_hour() {
        let rows = vec![row(1, 7, Some(1.0)), row(1, 9, Some(2.0)), row(2, 9, Some(3.0))];
        let dates = BTreeSet::from([NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()]);

        assert_eq!(select_rows(&rows, &dates, None).len(), 2);
        let selected = select_rows(&rows, &dates, Some(HourRange::new(8, 12).unwrap()));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value("T"), Some(2.0));
    }

    #[test]
    fn projection_keeps_requested_columns() {
        let rows = project(vec![row(1, 7, Some(1.0))], &["T".to_string()]);
        assert_eq!(rows[0].value("T"), Some(1.0));
        assert_eq!(rows[0].value("RH"), None);
    }

    #[test]
    fn aggregates_each_date_ignoring_nulls() {
        let rows = vec![
            row(1, 10, Some(10.0)),
            row(1, 11, None),
            row(1, 12, Some(14.0)),
            row(2, 10, Some(5.0)),
        ];
        let summaries = aggregate_by_date(&rows, &columns(), Aggregation::Mean);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].observations, 3);
        assert_eq!(summaries[0].value("T"), Some(12.0));
        assert_eq!(summaries[0].value("RH"), Some(50.0));
        assert_eq!(summaries[1].value("T"), Some(5.0));

        let max = aggregate_by_date(&rows, &columns(), Aggregation::Max);
        assert_eq!(max[0].value("T"), Some(14.0));
    }

    #[test]
    fn all_null_column_has_no_value() {
        let rows = vec![row(1, 10, None)];
        let summaries = aggregate_by_date(&rows, &columns(), Aggregation::Sum);
        assert_eq!(summaries[0].value("T"), None);
    }
}
