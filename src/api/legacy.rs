//! Legacy (pre-v6) API client: a single GET against `/admin/api.php`.

use super::{check_api_error, http_client, ApiError};
use crate::registry::HostConfig;
use serde_json::Value;
use std::time::Duration;

/// Fetch the legacy summary endpoint, optionally passing the API token as
/// a query parameter.
pub async fn fetch_legacy_summary(
    host: &HostConfig,
    timeout: Duration,
    with_token: bool,
) -> Result<Value, ApiError> {
    let token = if with_token {
        Some(host.token.as_deref().ok_or(ApiError::MissingToken)?)
    } else {
        None
    };
    let url = summary_url(host, token);

    let client = http_client(timeout)?;
    let body: Value = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    check_api_error(body)
}

fn summary_url(host: &HostConfig, token: Option<&str>) -> String {
    let mut url = format!("http://{}:{}/admin/api.php?summary", host.address, host.port);
    if let Some(token) = token {
        url.push_str("&auth=");
        url.push_str(token);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HostConfig {
        HostConfig {
            address: "10.0.0.5".to_string(),
            port: 80,
            name: "dns1".to_string(),
            token: Some("secret".to_string()),
        }
    }

    #[test]
    fn test_summary_url_without_token() {
        assert_eq!(
            summary_url(&host(), None),
            "http://10.0.0.5:80/admin/api.php?summary"
        );
    }

    #[test]
    fn test_summary_url_with_token() {
        assert_eq!(
            summary_url(&host(), Some("secret")),
            "http://10.0.0.5:80/admin/api.php?summary&auth=secret"
        );
    }

    #[tokio::test]
    async fn test_missing_token_is_an_error() {
        let mut host = host();
        host.token = None;
        let result = fetch_legacy_summary(&host, Duration::from_millis(100), true).await;
        assert!(matches!(result, Err(ApiError::MissingToken)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_network_error() {
        let mut host = host();
        host.address = "127.0.0.1".to_string();
        host.port = 9; // discard port, nothing listens here
        let result = fetch_legacy_summary(&host, Duration::from_millis(250), false).await;
        assert!(matches!(result, Err(ApiError::Http(_))));
    }
}
