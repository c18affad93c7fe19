//! Normalization of raw records into [`shootcal_core::Session`]s.
//!
//! Text fields arrive as arrays of tagged entries (`[{"type": "text",
//! "text": "..."}]`); the first entry's `text` wins and anything else falls
//! back to a default. The record date is converted using local-zone calendar
//! components, not UTC.

use chrono::{Local, TimeZone};
use serde_json::Value;
use shootcal_core::{Session, SessionStatus, DEFAULT_LOCATION, DEFAULT_MODEL};

use crate::error::RecordsError;
use crate::types::RawRecord;

/// A field that is present but cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedField {
    pub field: &'static str,
    pub reason: String,
}

impl MalformedField {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Normalizes `record` using the local time zone.
///
/// Returns `Ok(None)` when the record has no `Date`, which marks it as
/// lacking required fields.
///
/// # Errors
///
/// Returns [`MalformedField`] if `Date` or `Price` is present but unusable.
/// A negative `Price` is not unusable; it becomes 0 like a missing one.
pub fn normalize_record(record: &RawRecord) -> Result<Option<Session>, MalformedField> {
    normalize_record_in(record, &Local)
}

/// Normalizes `record`, taking calendar dates in `tz`.
///
/// # Errors
///
/// Returns [`MalformedField`] if `Date` or `Price` is present but unusable.
pub fn normalize_record_in<Tz: TimeZone>(
    record: &RawRecord,
    tz: &Tz,
) -> Result<Option<Session>, MalformedField> {
    let Some(millis) = parse_timestamp(record.field("Date"))? else {
        return Ok(None);
    };
    let date = tz
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| MalformedField::new("Date", format!("{millis} is out of range")))?
        .date_naive();

    let status = SessionStatus::from_source(record.field("Status").and_then(Value::as_str));
    let price = parse_price(record.field("Price"))?;

    Ok(Some(Session {
        date,
        location: first_text(record, "Location").unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        model: first_text(record, "Model").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        model_details: first_text(record, "Model Details").unwrap_or_default(),
        model_sizing: first_text(record, "Model Sizing").unwrap_or_default(),
        thumbnail_url: first_text(record, "Thumbnail Url"),
        model_image: first_text(record, "Model Url"),
        location_image: first_text(record, "Location Url"),
        status,
        price,
    }))
}

/// Normalizes a whole batch using the local time zone.
///
/// # Errors
///
/// See [`normalize_batch_in`].
pub fn normalize_batch(records: &[RawRecord]) -> Result<Vec<Session>, RecordsError> {
    normalize_batch_in(records, &Local)
}

/// Normalizes every record in order, dropping records without a date.
///
/// Batches are all-or-nothing: a single malformed record fails the batch.
///
/// # Errors
///
/// Returns [`RecordsError::MalformedRecord`] for the first record that
/// cannot be normalized.
pub fn normalize_batch_in<Tz: TimeZone>(
    records: &[RawRecord],
    tz: &Tz,
) -> Result<Vec<Session>, RecordsError> {
    let mut sessions = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match normalize_record_in(record, tz) {
            Ok(Some(session)) => sessions.push(session),
            Ok(None) => {
                tracing::debug!(index, "dropping record without a date");
            }
            Err(MalformedField { field, reason }) => {
                return Err(RecordsError::MalformedRecord {
                    index,
                    field,
                    reason,
                });
            }
        }
    }
    Ok(sessions)
}

/// First text of a tagged-entry array, kept verbatim. A bare string is
/// accepted as well; whitespace-only text counts as missing.
fn first_text(record: &RawRecord, name: &str) -> Option<String> {
    let text = match record.field(name)? {
        Value::Array(entries) => entries.first()?.get("text")?.as_str()?,
        Value::String(s) => s.as_str(),
        _ => return None,
    };
    (!text.trim().is_empty()).then(|| text.to_string())
}

fn parse_timestamp(value: Option<&Value>) -> Result<Option<i64>, MalformedField> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(ms) = n.as_i64() {
                return Ok(Some(ms));
            }
            match n.as_f64() {
                #[allow(clippy::cast_possible_truncation)]
                Some(f) if f.is_finite() && f.abs() < 9.0e15 => Ok(Some(f.trunc() as i64)),
                _ => Err(MalformedField::new("Date", format!("{n} is not a timestamp"))),
            }
        }
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| MalformedField::new("Date", format!("'{s}' is not a timestamp"))),
        Some(other) => Err(MalformedField::new(
            "Date",
            format!("expected a timestamp, got {other}"),
        )),
    }
}

fn parse_price(value: Option<&Value>) -> Result<f64, MalformedField> {
    let price = match value {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| MalformedField::new("Price", format!("{n} is not a number")))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| MalformedField::new("Price", format!("'{s}' is not a number")))?,
        Some(other) => {
            return Err(MalformedField::new(
                "Price",
                format!("expected a number, got {other}"),
            ))
        }
    };

    if !price.is_finite() {
        return Err(MalformedField::new("Price", format!("{price} is not an amount")));
    }
    if price < 0.0 {
        tracing::debug!(price, "negative price replaced with 0");
        return Ok(0.0);
    }
    Ok(price)
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
