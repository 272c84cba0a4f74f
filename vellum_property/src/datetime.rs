// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Date and time property kinds.
//!
//! The wire convention for all temporal values is milliseconds: since the
//! Unix epoch for dates and datetimes, absolute for durations.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta as Duration, Utc};
use serde_json::Value as Json;

use crate::error::{DeserializationError, ValidationError};
use crate::primitive::{json_mismatch, type_mismatch};
use crate::property::PropertyKind;
use crate::value::{ModelIndex, Value};

/// Milliseconds since the Unix epoch for midnight (UTC) of `date`.
#[must_use]
pub fn date_ms(date: &NaiveDate) -> f64 {
    datetime_ms(&date.and_time(NaiveTime::MIN))
}

/// Milliseconds since the Unix epoch, treating `datetime` as UTC.
#[must_use]
pub fn datetime_ms(datetime: &NaiveDateTime) -> f64 {
    datetime.and_utc().timestamp_micros() as f64 / 1000.0
}

/// Absolute milliseconds in `delta`.
#[must_use]
pub fn timedelta_ms(delta: &Duration) -> f64 {
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1000.0,
        None => delta.num_milliseconds() as f64,
    }
}

/// Converts a duration value into its millisecond representation.
///
/// Used as the converter for properties that accept [`TimeDelta`] as an
/// alternative form of a number. Other values pass through unchanged.
#[must_use]
pub fn convert_timedelta(value: Value) -> Value {
    match value {
        Value::TimeDelta(delta) => Value::Float(timedelta_ms(&delta)),
        other => other,
    }
}

/// Converts a date or datetime value into milliseconds since the epoch.
///
/// Used as the converter for properties that accept [`Datetime`] as an
/// alternative form of a number. Other values pass through unchanged.
#[must_use]
pub fn convert_datetime(value: Value) -> Value {
    match value {
        Value::Datetime(datetime) => Value::Float(datetime_ms(&datetime)),
        Value::Date(date) => Value::Float(date_ms(&date)),
        other => other,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "wire milliseconds are well within the i64 microsecond range"
)]
fn ms_to_micros(ms: f64) -> i64 {
    (ms * 1000.0).round() as i64
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// A calendar date, also accepting ISO `YYYY-MM-DD` strings.
#[derive(Clone, Copy, Debug, Default)]
pub struct Date;

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Date")
    }
}

impl PropertyKind for Date {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Null | Value::Date(_) => Ok(()),
            Value::String(text) if parse_date(text).is_some() => Ok(()),
            _ => Err(type_mismatch(self, value, detail)),
        }
    }

    fn transform(&self, value: Value) -> Value {
        match value {
            Value::String(text) => parse_date(&text).map_or(Value::String(text), Value::Date),
            other => other,
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::String(text) => parse_date(text)
                .map(Value::Date)
                .ok_or_else(|| json_mismatch(self, "an ISO date", json)),
            Json::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|datetime| Value::Date(datetime.date_naive()))
                .ok_or_else(|| json_mismatch(self, "milliseconds since the epoch", json)),
            _ => Err(json_mismatch(self, "an ISO date", json)),
        }
    }
}

/// A date and time; plain dates are accepted as midnight.
#[derive(Clone, Copy, Debug, Default)]
pub struct Datetime;

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Datetime")
    }
}

impl PropertyKind for Datetime {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Null | Value::Datetime(_) | Value::Date(_) => Ok(()),
            _ => Err(type_mismatch(self, value, detail)),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Number(n) => n
                .as_f64()
                .and_then(|ms| DateTime::<Utc>::from_timestamp_micros(ms_to_micros(ms)))
                .map(|datetime| Value::Datetime(datetime.naive_utc()))
                .ok_or_else(|| json_mismatch(self, "milliseconds since the epoch", json)),
            _ => Err(json_mismatch(self, "milliseconds since the epoch", json)),
        }
    }
}

/// A signed duration.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeDelta;

impl fmt::Display for TimeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TimeDelta")
    }
}

impl PropertyKind for TimeDelta {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Null | Value::TimeDelta(_) => Ok(()),
            _ => Err(type_mismatch(self, value, detail)),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Number(n) => n
                .as_f64()
                .map(|ms| Value::TimeDelta(Duration::microseconds(ms_to_micros(ms))))
                .ok_or_else(|| json_mismatch(self, "milliseconds", json)),
            _ => Err(json_mismatch(self, "milliseconds", json)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timedelta_converts_to_absolute_milliseconds() {
        let delta = Duration::days(3) + Duration::seconds(54);
        assert_eq!(convert_timedelta(Value::TimeDelta(delta)), Value::Float(259_254_000.0));
        assert_eq!(convert_timedelta(Value::Int(4)), Value::Int(4));
    }

    #[test]
    fn dates_convert_to_epoch_milliseconds() {
        let date = NaiveDate::from_ymd_opt(2016, 5, 11).unwrap();
        assert_eq!(convert_datetime(Value::Date(date)), Value::Float(1_462_924_800_000.0));

        let datetime = date.and_hms_milli_opt(0, 0, 1, 500).unwrap();
        assert_eq!(
            convert_datetime(Value::Datetime(datetime)),
            Value::Float(1_462_924_801_500.0)
        );
    }

    #[test]
    fn date_accepts_iso_strings() {
        assert!(Date.validate(&Value::from("2017-02-01"), true).is_ok());
        assert!(Date.validate(&Value::from("02/01/2017"), true).is_err());
        let date = NaiveDate::from_ymd_opt(2017, 2, 1).unwrap();
        assert_eq!(Date.transform(Value::from("2017-02-01")), Value::Date(date));
    }

    #[test]
    fn datetime_accepts_dates() {
        let date = NaiveDate::from_ymd_opt(2017, 2, 1).unwrap();
        assert!(Datetime.validate(&Value::Date(date), true).is_ok());
        assert!(Datetime.validate(&Value::Int(1), false).is_err());
    }

    #[test]
    fn timedelta_round_trips_through_json() {
        let json = serde_json::json!(1500.0);
        let value = TimeDelta.from_json(&json, None).unwrap();
        assert_eq!(value, Value::TimeDelta(Duration::milliseconds(1500)));
        assert!(TimeDelta.from_json(&serde_json::json!("soon"), None).is_err());
    }
}
