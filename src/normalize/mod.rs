//! Turns provider payloads into canonical rows.

pub mod daily;
pub mod error;
pub mod hourly;

use crate::normalize::error::NormalizeError;
use crate::types::observation::CachedObservation;
use crate::types::payload::RawPayload;
use crate::types::provider_kind::Resolution;
use crate::types::variable::{VariableDescriptor, VariableTable};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde_json::Value;

/// Stateless payload normalizer for one cache (timezone and representative hour).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordNormalizer {
    timezone: Tz,
    representative_hour: u32,
}

impl RecordNormalizer {
    pub fn new(timezone: Tz, representative_hour: u32) -> Self {
        Self {
            timezone,
            representative_hour,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn representative_hour(&self) -> u32 {
        self.representative_hour
    }

    /// Normalizes the payload fetched for `date` (and `variable`, for
    /// hourly-per-variable providers). An empty payload yields no rows.
    pub fn normalize(
        &self,
        resolution: Resolution,
        table: &VariableTable,
        payload: &RawPayload,
        date: NaiveDate,
        variable: Option<&VariableDescriptor>,
    ) -> Result<Vec<CachedObservation>, NormalizeError> {
        if payload.is_empty() {
            return Ok(Vec::new());
        }
        match (resolution, variable) {
            (Resolution::Daily, _) => daily::normalize_daily(
                table,
                payload,
                date,
                self.timezone,
                self.representative_hour,
            ),
            (Resolution::HourlyPerVariable, Some(variable)) => {
                hourly::normalize_hourly(variable, payload, date, self.timezone)
            }
            (Resolution::HourlyPerVariable, None) => Err(NormalizeError::UnexpectedShape(
                "hourly payload without a variable".to_string(),
            )),
        }
    }
}

/// Reads a provider number. Strings may use a decimal comma; `Ip` is a trace
/// amount and reads as zero. Null and empty strings are missing values.
pub(crate) fn parse_number(field: &str, value: &Value) -> Result<Option<f64>, NormalizeError> {
    let invalid = || NormalizeError::InvalidNumber {
        field: field.to_string(),
        value: value.to_string(),
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_f64().map(Some).ok_or_else(invalid),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("acum") {
                Ok(None)
            } else if s.eq_ignore_ascii_case("ip") {
                Ok(Some(0.0))
            } else {
                s.replace(',', ".").parse::<f64>().map(Some).map_err(|_| invalid())
            }
        }
        _ => Err(invalid()),
    }
}
