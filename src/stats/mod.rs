//! Stats normalization.
//!
//! Transforms the heterogeneous raw API payloads into one fixed field set,
//! independent of which API generation produced them. Normalization is
//! pure: the same payload and reference time always produce the same
//! result.

mod legacy;
mod session;

pub use legacy::*;
pub use session::*;

use crate::config::ApiVersion;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Normalization error types.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("missing field \"{0}\" in stats payload")]
    MissingField(&'static str),
    #[error("field \"{0}\" has an unexpected type")]
    UnexpectedType(&'static str),
}

/// A single sink field value.
///
/// The variant fixes the type the sink reports for that field, so a given
/// field name must keep one variant across writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

/// The fixed field set written to the `stats` measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedStats {
    pub ads_percentage_today: f64,
    pub queries_blocked: i64,
    pub queries_cached: i64,
    pub queries_forwarded: i64,
    pub clients_ever_seen: i64,
    pub clients_active: i64,
    pub domains_being_blocked: i64,
    pub unique_domains: i64,
    /// Dynamic per-reply-type and per-query-type counters, their running
    /// totals, and any legacy summary keys without a fixed slot.
    #[serde(flatten)]
    pub extras: BTreeMap<String, FieldValue>,
}

impl NormalizedStats {
    /// Full field set in write order, fixed fields first.
    pub fn field_set(&self) -> Vec<(String, FieldValue)> {
        let mut fields = vec![
            (
                "ads_percentage_today".to_string(),
                FieldValue::Float(self.ads_percentage_today),
            ),
            (
                "queries_blocked".to_string(),
                FieldValue::Integer(self.queries_blocked),
            ),
            (
                "queries_cached".to_string(),
                FieldValue::Integer(self.queries_cached),
            ),
            (
                "queries_forwarded".to_string(),
                FieldValue::Integer(self.queries_forwarded),
            ),
            (
                "clients_ever_seen".to_string(),
                FieldValue::Integer(self.clients_ever_seen),
            ),
            (
                "clients_active".to_string(),
                FieldValue::Integer(self.clients_active),
            ),
            (
                "domains_being_blocked".to_string(),
                FieldValue::Integer(self.domains_being_blocked),
            ),
            (
                "unique_domains".to_string(),
                FieldValue::Integer(self.unique_domains),
            ),
        ];
        fields.extend(self.extras.iter().map(|(k, v)| (k.clone(), v.clone())));
        fields
    }
}

/// Freshness of the blocklist (gravity) database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GravityStatus {
    pub file_exists: bool,
    pub seconds_since_last_update: i64,
}

impl GravityStatus {
    /// Field set written to the `gravity` measurement.
    pub fn field_set(&self) -> Vec<(String, FieldValue)> {
        vec![
            (
                "file_exists".to_string(),
                FieldValue::Boolean(self.file_exists),
            ),
            (
                "seconds_since_last_update".to_string(),
                FieldValue::Integer(self.seconds_since_last_update),
            ),
        ]
    }
}

/// Normalize a raw payload according to the API generation that produced
/// it. `now` is the reference time for gravity freshness arithmetic.
pub fn normalize(
    version: ApiVersion,
    payload: &Value,
    now: DateTime<Utc>,
) -> Result<(NormalizedStats, GravityStatus), StatsError> {
    match version {
        ApiVersion::Legacy | ApiVersion::LegacyToken => normalize_legacy_summary(payload),
        ApiVersion::Session => normalize_session_summary(payload, now),
    }
}

/// Coerce a locale-formatted count such as `"1,234"` to an integer.
///
/// Anything that is not all digits after stripping the separators passes
/// through unchanged as text.
pub(crate) fn coerce_count(raw: &str) -> FieldValue {
    let cleaned = raw.replace(',', "");
    if !cleaned.is_empty() && cleaned.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = cleaned.parse() {
            return FieldValue::Integer(n);
        }
    }
    FieldValue::Text(raw.to_string())
}

pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => match coerce_count(s) {
            FieldValue::Integer(n) => Some(n),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn require<'a>(payload: &'a Value, key: &'static str) -> Result<&'a Value, StatsError> {
    payload.get(key).ok_or(StatsError::MissingField(key))
}

pub(crate) fn require_i64(payload: &Value, key: &'static str) -> Result<i64, StatsError> {
    value_as_i64(require(payload, key)?).ok_or(StatsError::UnexpectedType(key))
}

pub(crate) fn require_f64(payload: &Value, key: &'static str) -> Result<f64, StatsError> {
    value_as_f64(require(payload, key)?).ok_or(StatsError::UnexpectedType(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_count_strips_thousands_separators() {
        assert_eq!(coerce_count("1,234,567"), FieldValue::Integer(1_234_567));
        assert_eq!(coerce_count("42"), FieldValue::Integer(42));
    }

    #[test]
    fn test_coerce_count_passes_non_numeric_through() {
        assert_eq!(
            coerce_count("enabled"),
            FieldValue::Text("enabled".to_string())
        );
        assert_eq!(coerce_count("1.5"), FieldValue::Text("1.5".to_string()));
        assert_eq!(coerce_count(""), FieldValue::Text(String::new()));
    }

    #[test]
    fn test_require_f64_accepts_integral_zero() {
        let payload = json!({"percent_blocked": 0});
        assert_eq!(require_f64(&payload, "percent_blocked").unwrap(), 0.0);
    }

    #[test]
    fn test_require_reports_missing_field() {
        let err = require_i64(&json!({}), "blocked").unwrap_err();
        assert!(matches!(err, StatsError::MissingField("blocked")));
    }

    #[test]
    fn test_field_set_keeps_percentage_as_float() {
        let stats = NormalizedStats {
            ads_percentage_today: 0.0,
            queries_blocked: 0,
            queries_cached: 0,
            queries_forwarded: 0,
            clients_ever_seen: 0,
            clients_active: 0,
            domains_being_blocked: 0,
            unique_domains: 0,
            extras: BTreeMap::new(),
        };
        let fields = stats.field_set();
        assert_eq!(fields[0].0, "ads_percentage_today");
        assert!(matches!(fields[0].1, FieldValue::Float(_)));
    }
}
