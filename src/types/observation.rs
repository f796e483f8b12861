use chrono::{DateTime, NaiveDate, Timelike};
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// One canonical row of the weather cache.
///
/// `values` maps a variable acronym to its value; an absent key is a null
/// (the variable was not reported for that hour or date).
#[derive(Debug, Clone, PartialEq)]
pub struct CachedObservation {
    pub timestamp: DateTime<Tz>,
    pub date: NaiveDate,
    pub hour: u32,
    pub values: BTreeMap<String, f64>,
}

impl CachedObservation {
    /// Creates an empty row; `hour` is taken from `timestamp` in its own zone.
    pub fn new(timestamp: DateTime<Tz>, date: NaiveDate) -> Self {
        Self {
            hour: timestamp.hour(),
            timestamp,
            date,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, acronym: impl Into<String>, value: f64) -> Self {
        self.values.insert(acronym.into(), value);
        self
    }

    pub fn value(&self, acronym: &str) -> Option<f64> {
        self.values.get(acronym).copied()
    }

    /// Identity of the row within a store.
    pub fn key(&self) -> (NaiveDate, u32) {
        (self.date, self.hour)
    }

    /// Fills values missing in `self` from `other`. Existing values win.
    pub fn merge_from(&mut self, other: &Self) {
        for (acronym, value) in &other.values {
            self.values.entry(acronym.clone()).or_insert(*value);
        }
        if other.timestamp < self.timestamp {
            self.timestamp = other.timestamp;
        }
    }
}
