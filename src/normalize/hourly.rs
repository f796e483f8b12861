use crate::normalize::error::NormalizeError;
use crate::normalize::parse_number;
use crate::types::observation::CachedObservation;
use crate::types::payload::RawPayload;
use crate::types::variable::{round_to, VariableDescriptor};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const VALIDATED: &str = "V";

#[derive(Debug, Deserialize)]
struct Reading {
    data: String,
    #[serde(default)]
    valor: Value,
    #[serde(default)]
    estat: Option<String>,
}

/// Parses the timestamp formats the provider emits into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, NormalizeError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%MZ", "%Y-%m-%dT%H:%M:%S%.fZ"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z")
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| NormalizeError::InvalidTimestamp(raw.to_string()))
}

fn hour_start(ts: DateTime<Tz>) -> DateTime<Tz> {
    let ts = ts.with_nanosecond(0).unwrap_or(ts);
    ts - Duration::minutes(i64::from(ts.minute())) - Duration::seconds(i64::from(ts.second()))
}

/// One row per local hour holding the mean of that hour's validated readings.
///
/// Rows carry the requested `date` so that a UTC day that straddles local
/// midnight still belongs to the day it was fetched for.
pub fn normalize_hourly(
    variable: &VariableDescriptor,
    payload: &RawPayload,
    date: NaiveDate,
    timezone: Tz,
) -> Result<Vec<CachedObservation>, NormalizeError> {
    let lectures = match payload.as_value() {
        Value::Object(map) => map.get("lectures"),
        Value::Array(items) => items.iter().find_map(|item| item.get("lectures")),
        other => {
            return Err(NormalizeError::UnexpectedShape(format!(
                "expected a readings document, got {other}"
            )))
        }
    };
    let Some(lectures) = lectures else {
        return Ok(Vec::new());
    };
    let lectures = lectures
        .as_array()
        .ok_or_else(|| NormalizeError::UnexpectedShape("'lectures' is not a list".to_string()))?;

    let mut hours: BTreeMap<u32, (DateTime<Tz>, Vec<f64>)> = BTreeMap::new();
    for lecture in lectures {
        let reading: Reading = serde_json::from_value(lecture.clone())
            .map_err(|e| NormalizeError::UnexpectedShape(e.to_string()))?;
        if reading.estat.as_deref() != Some(VALIDATED) {
            continue;
        }
        let Some(value) = parse_number("valor", &reading.valor)? else {
            continue;
        };
        let start = hour_start(parse_timestamp(&reading.data)?.with_timezone(&timezone));
        let entry = hours
            .entry(start.hour())
            .or_insert_with(|| (start, Vec::new()));
        if start < entry.0 {
            entry.0 = start;
        }
        entry.1.push(value);
    }

    let rows = hours
        .into_values()
        .map(|(start, values)| {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            CachedObservation::new(start, date)
                .with_value(variable.acronym, round_to(mean, variable.decimals))
        })
        .collect();
    Ok(rows)
}
