//! Metrics sink.
//!
//! Writes the `stats` and `gravity` measurements for one host to the
//! InfluxDB 2 write endpoint, or prints them in dry-run mode.

mod line;

pub use line::*;

use crate::config::Settings;
use crate::registry::HostConfig;
use crate::stats::{GravityStatus, NormalizedStats};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use thiserror::Error;

/// Sink error types.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("write request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("write rejected with status {status}: {message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },
}

/// Connection details for the InfluxDB 2 write endpoint.
#[derive(Debug, Clone)]
pub struct InfluxSink {
    url: String,
    organization: String,
    bucket: String,
    token: String,
    timeout: Duration,
}

impl InfluxSink {
    /// Build the sink from settings. Returns `None` when any connection
    /// detail is absent (dry-run mode does not need them).
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        Some(Self {
            url: settings.influx_url.clone()?,
            organization: settings.influx_organization.clone()?,
            bucket: settings.influx_bucket.clone()?,
            token: settings.influx_token.clone()?,
            timeout: settings.http_timeout(),
        })
    }

    /// Write both measurements for one host in a single acknowledged
    /// request: the call succeeds only once the server accepted the points.
    ///
    /// The client handle lives only for this attempt and is dropped
    /// unconditionally when the function returns.
    pub async fn write(
        &self,
        host: &HostConfig,
        service: &str,
        stats: &NormalizedStats,
        gravity: &GravityStatus,
    ) -> Result<(), SinkError> {
        let tags = [("host", host.name.as_str()), ("service", service)];
        let body = format!(
            "{}\n{}",
            encode_point("stats", &tags, &stats.field_set()),
            encode_point("gravity", &tags, &gravity.field_set()),
        );

        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let response = client
            .post(format!("{}/api/v2/write", self.url))
            .query(&[
                ("org", self.organization.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "s"),
            ])
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected { status, message });
        }
        Ok(())
    }
}

/// Where normalized results go: the write endpoint, or stdout in dry-run
/// mode.
pub enum Output {
    Influx(InfluxSink),
    Stdout,
}

impl Output {
    pub async fn publish(
        &self,
        host: &HostConfig,
        service: &str,
        stats: &NormalizedStats,
        gravity: &GravityStatus,
    ) -> Result<(), SinkError> {
        match self {
            Output::Influx(sink) => sink.write(host, service, stats, gravity).await,
            Output::Stdout => {
                print_results(host, stats, gravity);
                Ok(())
            }
        }
    }
}

fn print_results(host: &HostConfig, stats: &NormalizedStats, gravity: &GravityStatus) {
    println!("\nStats for host {}:", host.label());
    println!(
        "{}",
        serde_json::to_string_pretty(stats).unwrap_or_default()
    );
    println!("\nGravity for host {}:", host.label());
    println!(
        "{}",
        serde_json::to_string_pretty(gravity).unwrap_or_default()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::FieldValue;
    use std::collections::BTreeMap;

    fn sample_stats() -> NormalizedStats {
        let mut extras = BTreeMap::new();
        extras.insert("dns_replies_all_types".to_string(), FieldValue::Integer(25));
        NormalizedStats {
            ads_percentage_today: 0.0,
            queries_blocked: 12,
            queries_cached: 5,
            queries_forwarded: 30,
            clients_ever_seen: 10,
            clients_active: 3,
            domains_being_blocked: 15000,
            unique_domains: 8,
            extras,
        }
    }

    #[tokio::test]
    async fn test_unreachable_sink_is_a_write_failure() {
        let sink = InfluxSink {
            url: "http://127.0.0.1:9".to_string(),
            organization: "org".to_string(),
            bucket: "bucket".to_string(),
            token: "token".to_string(),
            timeout: Duration::from_millis(250),
        };
        let host = HostConfig {
            address: "10.0.0.5".to_string(),
            port: 80,
            name: "dns1".to_string(),
            token: None,
        };
        let gravity = GravityStatus {
            file_exists: false,
            seconds_since_last_update: 0,
        };
        let result = sink.write(&host, "pihole", &sample_stats(), &gravity).await;
        assert!(matches!(result, Err(SinkError::Http(_))));
    }

    #[tokio::test]
    async fn test_stdout_output_never_fails() {
        let host = HostConfig {
            address: "10.0.0.5".to_string(),
            port: 80,
            name: "dns1".to_string(),
            token: None,
        };
        let gravity = GravityStatus {
            file_exists: true,
            seconds_since_last_update: 3600,
        };
        let result = Output::Stdout
            .publish(&host, "pihole", &sample_stats(), &gravity)
            .await;
        assert!(result.is_ok());
    }
}
