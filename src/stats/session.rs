//! Normalizer for the v6 `stats/summary` payload.

use super::{
    require, require_f64, require_i64, value_as_i64, FieldValue, GravityStatus, NormalizedStats,
    StatsError,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Normalize a v6 payload: nested `queries`/`clients`/`gravity` objects
/// with dynamic per-reply-type and per-query-type counter maps.
pub fn normalize_session_summary(
    payload: &Value,
    now: DateTime<Utc>,
) -> Result<(NormalizedStats, GravityStatus), StatsError> {
    let queries = require(payload, "queries")?;
    let clients = require(payload, "clients")?;
    let gravity = require(payload, "gravity")?;

    let mut extras = BTreeMap::new();

    let replies = require(queries, "replies")?
        .as_object()
        .ok_or(StatsError::UnexpectedType("queries.replies"))?;
    let total = flatten_counters(replies, "reply_", "queries.replies", &mut extras)?;
    extras.insert(
        "dns_replies_all_types".to_string(),
        FieldValue::Integer(total),
    );

    let types = require(queries, "types")?
        .as_object()
        .ok_or(StatsError::UnexpectedType("queries.types"))?;
    let total = flatten_counters(types, "query_", "queries.types", &mut extras)?;
    extras.insert(
        "dns_queries_all_types".to_string(),
        FieldValue::Integer(total),
    );

    let stats = NormalizedStats {
        ads_percentage_today: require_f64(queries, "percent_blocked")?,
        queries_blocked: require_i64(queries, "blocked")?,
        queries_cached: require_i64(queries, "cached")?,
        queries_forwarded: require_i64(queries, "forwarded")?,
        clients_ever_seen: require_i64(clients, "total")?,
        clients_active: require_i64(clients, "active")?,
        domains_being_blocked: require_i64(gravity, "domains_being_blocked")?,
        unique_domains: require_i64(queries, "unique_domains")?,
        extras,
    };

    let last_update = require_i64(gravity, "last_update")?;
    Ok((stats, gravity_from_epoch(last_update, now)))
}

/// Flatten a counter map into prefixed fields, returning the running total.
///
/// The key set is not fixed; it is discovered from the payload each cycle.
fn flatten_counters(
    counters: &Map<String, Value>,
    prefix: &str,
    context: &'static str,
    extras: &mut BTreeMap<String, FieldValue>,
) -> Result<i64, StatsError> {
    let mut total = 0;
    for (key, value) in counters {
        let count = value_as_i64(value).ok_or(StatsError::UnexpectedType(context))?;
        extras.insert(format!("{prefix}{key}"), FieldValue::Integer(count));
        total += count;
    }
    Ok(total)
}

/// Gravity freshness from an absolute last-update epoch. An epoch of
/// exactly zero means the gravity database was never built.
pub(crate) fn gravity_from_epoch(last_update: i64, now: DateTime<Utc>) -> GravityStatus {
    GravityStatus {
        file_exists: last_update != 0,
        seconds_since_last_update: now.timestamp() - last_update,
    }
}
