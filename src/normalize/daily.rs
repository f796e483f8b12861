use crate::normalize::error::NormalizeError;
use crate::normalize::parse_number;
use crate::types::observation::CachedObservation;
use crate::types::payload::RawPayload;
use crate::types::variable::{round_to, VariableTable};
use chrono::{DateTime, NaiveDate, TimeZone};
use chrono_tz::Tz;
use serde_json::Value;
use std::collections::BTreeMap;

/// `date` at `hour` o'clock local time, the timestamp of a daily row.
pub fn representative_timestamp(
    date: NaiveDate,
    hour: u32,
    timezone: Tz,
) -> Result<DateTime<Tz>, NormalizeError> {
    let nonexistent = || NormalizeError::NonexistentLocalTime {
        date,
        hour,
        timezone,
    };
    let local = date.and_hms_opt(hour, 0, 0).ok_or_else(nonexistent)?;
    timezone
        .from_local_datetime(&local)
        .earliest()
        .ok_or_else(nonexistent)
}

/// One row per record dated `date`. Min/max pairs are averaged into their
/// combined variable when both members are present and dropped otherwise.
pub fn normalize_daily(
    table: &VariableTable,
    payload: &RawPayload,
    date: NaiveDate,
    timezone: Tz,
    representative_hour: u32,
) -> Result<Vec<CachedObservation>, NormalizeError> {
    let records = match payload.as_value() {
        Value::Array(items) => items.as_slice(),
        record @ Value::Object(_) => std::slice::from_ref(record),
        other => {
            return Err(NormalizeError::UnexpectedShape(format!(
                "expected daily records, got {other}"
            )))
        }
    };
    let timestamp = representative_timestamp(date, representative_hour, timezone)?;
    let day = date.format("%Y-%m-%d").to_string();

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let fields = record.as_object().ok_or_else(|| {
            NormalizeError::UnexpectedShape(format!("daily record is not an object: {record}"))
        })?;
        if let Some(fecha) = fields.get("fecha").and_then(Value::as_str) {
            if fecha != day {
                continue;
            }
        }

        let mut raw: BTreeMap<&str, f64> = BTreeMap::new();
        for descriptor in table.descriptors {
            if let Some(value) = fields.get(descriptor.code) {
                if let Some(number) = parse_number(descriptor.code, value)? {
                    raw.insert(descriptor.acronym, number);
                }
            }
        }

        let mut row = CachedObservation::new(timestamp, date);
        for pair in table.pairs {
            if let (Some(min), Some(max)) = (raw.get(pair.min), raw.get(pair.max)) {
                let decimals = table.decimals_for(pair.acronym).unwrap_or(1);
                row.values
                    .insert(pair.acronym.to_string(), round_to((min + max) / 2.0, decimals));
            }
        }
        for descriptor in table.descriptors {
            if table.pair_of(descriptor.acronym).is_some() {
                continue;
            }
            if let Some(value) = raw.get(descriptor.acronym) {
                row.values.insert(
                    descriptor.acronym.to_string(),
                    round_to(*value, descriptor.decimals),
                );
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::variable::AEMET_VARIABLES;
    use chrono::Timelike;
    use chrono_tz::Europe::Madrid;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
    }

    #[test]
    fn min_max_pairs_are_averaged() {
        let payload = RawPayload(json!([{
            "fecha": "2022-01-01",
            "indicativo": "0076",
            "tmin": "10,0",
            "tmax": "20,0",
            "prec": "Ip",
            "presMin": "1012,4",
            "presMax": "1019,0",
            "hrMedia": "78",
            "velmedia": "3,1"
        }]));
        let rows = normalize_daily(&AEMET_VARIABLES, &payload, date(), Madrid, 12).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.value("T"), Some(15.0));
        assert_eq!(row.value("p"), Some(1015.7));
        assert_eq!(row.value("pp"), Some(0.0));
        assert_eq!(row.value("RH"), Some(78.0));
        assert_eq!(row.value("ws"), Some(3.1));
        assert_eq!(row.value("Tmin"), None);
        assert_eq!(row.hour, 12);
        assert_eq!(row.timestamp.hour(), 12);
        assert_eq!(row.date, date());
    }

    #[test]
    fn lone_pair_member_is_null() {
        let payload = RawPayload(json!([{"fecha": "2022-01-01", "tmax": "20,0", "prec": "0,0"}]));
        let rows = normalize_daily(&AEMET_VARIABLES, &payload, date(), Madrid, 12).unwrap();
        assert_eq!(rows[0].value("T"), None);
        assert_eq!(rows[0].value("pp"), Some(0.0));
    }

    #[test]
    fn other_dates_are_ignored() {
        let payload = RawPayload(json!([
            {"fecha": "2021-12-31", "tmin": "1,0", "tmax": "2,0"},
            {"fecha": "2022-01-01", "tmin": "3,0", "tmax": "5,0"}
        ]));
        let rows = normalize_daily(&AEMET_VARIABLES, &payload, date(), Madrid, 12).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value("T"), Some(4.0));
    }

    #[test]
    fn garbage_value_fails() {
        let payload = RawPayload(json!([{"fecha": "2022-01-01", "tmin": "cold"}]));
        assert!(matches!(
            normalize_daily(&AEMET_VARIABLES, &payload, date(), Madrid, 12),
            Err(NormalizeError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn skipped_local_hour_is_an_error() {
        let spring_forward = NaiveDate::from_ymd_opt(2022, 3, 27).unwrap();
        assert!(matches!(
            representative_timestamp(spring_forward, 2, Madrid),
            Err(NormalizeError::NonexistentLocalTime { .. })
        ));
        assert!(representative_timestamp(spring_forward, 12, Madrid).is_ok());
    }
}
