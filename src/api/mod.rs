//! Pi-hole API clients.
//!
//! Supports three API generations, selected by configuration: the legacy
//! unauthenticated summary endpoint, the legacy token-in-URL variant, and
//! the v6 session exchange.

mod legacy;
mod session;

pub use legacy::*;
pub use session::*;

use crate::config::ApiVersion;
use crate::registry::HostConfig;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// API client error types.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: <{0}>")]
    Api(String),
    #[error("invalid session: <{0}>")]
    InvalidSession(String),
    #[error("host has no API token configured")]
    MissingToken,
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Fetch the raw statistics payload from a host using the configured API
/// generation.
///
/// Any failure skips the remaining work for this host; there is no retry
/// within a cycle.
pub async fn fetch_stats(
    version: ApiVersion,
    host: &HostConfig,
    timeout: Duration,
    strict_logout: bool,
) -> Result<Value, ApiError> {
    match version {
        ApiVersion::Legacy => fetch_legacy_summary(host, timeout, false).await,
        ApiVersion::LegacyToken => fetch_legacy_summary(host, timeout, true).await,
        ApiVersion::Session => fetch_session_summary(host, timeout, strict_logout).await,
    }
}

/// Build the HTTP client used for one exchange with a host.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Surface an API-reported `error` key as a failure; pass the payload
/// through otherwise.
pub(crate) fn check_api_error(body: Value) -> Result<Value, ApiError> {
    if let Some(error) = body.get("error") {
        return Err(ApiError::Api(error.to_string()));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_api_error_passes_clean_payload() {
        let payload = json!({"queries": {"blocked": 1}});
        assert!(check_api_error(payload).is_ok());
    }

    #[test]
    fn test_check_api_error_surfaces_error_key() {
        let payload = json!({"error": {"key": "unauthorized", "message": "no session"}});
        let err = check_api_error(payload).unwrap_err();
        assert!(matches!(err, ApiError::Api(_)));
    }
}
