//! Session-based (v6) API client: login, fetch, logout.
//!
//! The v6 API hands out a session id and an anti-forgery token on login;
//! both must accompany the stats request, and the session is released with
//! a DELETE afterwards so the host's session table is not exhausted.

use super::{check_api_error, http_client, ApiError};
use crate::registry::HostConfig;
use serde_json::{json, Value};
use std::time::Duration;

const SID_HEADER: &str = "X-FTL-SID";
const CSRF_HEADER: &str = "X-FTL-CSRF";

#[derive(Debug)]
struct SessionHandle {
    sid: String,
    csrf: String,
}

/// Run the three-step session exchange and return the stats payload.
///
/// With `strict_logout` set, a failed logout fails the whole exchange even
/// though the stats were already retrieved; otherwise it is only logged.
pub async fn fetch_session_summary(
    host: &HostConfig,
    timeout: Duration,
    strict_logout: bool,
) -> Result<Value, ApiError> {
    let client = http_client(timeout)?;
    let auth_url = format!("http://{}:{}/api/auth", host.address, host.port);
    let stats_url = format!("http://{}:{}/api/stats/summary", host.address, host.port);

    tracing::debug!("authenticating on {}", host.label());

    // A v6 instance without a password still wants the login step; it
    // answers with a valid session for an empty password.
    let password = host.token.clone().unwrap_or_default();
    let body: Value = client
        .post(&auth_url)
        .json(&json!({ "password": password }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let session = extract_session(&check_api_error(body)?)?;

    tracing::debug!("getting data from {}", host.label());
    let body: Value = client
        .get(&stats_url)
        .header(SID_HEADER, session.sid.as_str())
        .header(CSRF_HEADER, session.csrf.as_str())
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let stats = check_api_error(body)?;

    tracing::debug!("releasing session on {}", host.label());
    let logout = async {
        client
            .delete(&auth_url)
            .header(SID_HEADER, session.sid.as_str())
            .header(CSRF_HEADER, session.csrf.as_str())
            .send()
            .await?
            .error_for_status()?;
        Ok::<(), reqwest::Error>(())
    }
    .await;

    if let Err(e) = logout {
        if strict_logout {
            return Err(ApiError::Http(e));
        }
        tracing::warn!("logout failed for {}: {}", host.label(), e);
    }

    Ok(stats)
}

/// Validate the auth response and pull out the session credentials.
fn extract_session(auth: &Value) -> Result<SessionHandle, ApiError> {
    let session = auth
        .get("session")
        .ok_or_else(|| ApiError::Malformed("auth response has no session object".to_string()))?;

    if !session.get("valid").and_then(Value::as_bool).unwrap_or(false) {
        let message = session
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        return Err(ApiError::InvalidSession(message));
    }

    let sid = session
        .get("sid")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Malformed("session has no sid".to_string()))?;
    let csrf = session
        .get("csrf")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Malformed("session has no csrf".to_string()))?;

    Ok(SessionHandle {
        sid: sid.to_string(),
        csrf: csrf.to_string(),
    })
}
