//! Normalizer for the legacy `api.php?summary` payload.
//!
//! The legacy API reports a flat map whose counts arrive as
//! locale-formatted strings ("1,234"); the gravity freshness comes as a
//! relative days/hours/minutes breakdown instead of an epoch.

use super::{
    coerce_count, require, require_f64, require_i64, FieldValue, GravityStatus, NormalizedStats,
    StatsError,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Legacy summary keys mapped onto fixed slots (or consumed for gravity);
/// everything else lands in the extras map.
const CONSUMED_KEYS: [&str; 9] = [
    "ads_percentage_today",
    "ads_blocked_today",
    "queries_cached",
    "queries_forwarded",
    "clients_ever_seen",
    "unique_clients",
    "domains_being_blocked",
    "unique_domains",
    "gravity_last_updated",
];

/// Normalize a legacy payload: a flat key/value summary.
pub fn normalize_legacy_summary(
    payload: &Value,
) -> Result<(NormalizedStats, GravityStatus), StatsError> {
    let summary = payload
        .as_object()
        .ok_or(StatsError::UnexpectedType("summary"))?;

    let mut extras = BTreeMap::new();
    for (key, value) in summary {
        if CONSUMED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let field = match value {
            Value::String(s) => coerce_count(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::Bool(b) => FieldValue::Boolean(*b),
            // Nested values have no sink representation.
            _ => continue,
        };
        extras.insert(key.clone(), field);
    }

    let stats = NormalizedStats {
        ads_percentage_today: require_f64(payload, "ads_percentage_today")?,
        queries_blocked: require_i64(payload, "ads_blocked_today")?,
        queries_cached: require_i64(payload, "queries_cached")?,
        queries_forwarded: require_i64(payload, "queries_forwarded")?,
        clients_ever_seen: require_i64(payload, "clients_ever_seen")?,
        clients_active: require_i64(payload, "unique_clients")?,
        domains_being_blocked: require_i64(payload, "domains_being_blocked")?,
        unique_domains: require_i64(payload, "unique_domains")?,
        extras,
    };

    let gravity = gravity_from_relative(require(payload, "gravity_last_updated")?)?;
    Ok((stats, gravity))
}

/// Gravity freshness from the relative days/hours/minutes breakdown.
fn gravity_from_relative(gravity: &Value) -> Result<GravityStatus, StatsError> {
    let file_exists = gravity
        .get("file_exists")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let relative = require(gravity, "relative")?;

    let days = require_i64(relative, "days")?;
    let hours = require_i64(relative, "hours")?;
    let minutes = require_i64(relative, "minutes")?;

    Ok(GravityStatus {
        file_exists,
        seconds_since_last_update: minutes * 60 + hours * 3600 + days * 86400,
    })
}
