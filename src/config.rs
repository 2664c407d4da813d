//! Configuration module for pihole-influx.
//!
//! Every setting is read from an environment variable (with a matching CLI
//! flag), captured once at startup into an immutable [`Settings`] struct
//! that is passed explicitly to each component.

use clap::{ArgAction, Parser, ValueEnum};
use std::time::Duration;

/// Which generation of the Pi-hole HTTP API to speak.
///
/// The variant is selected by configuration and applies to every host in
/// the registry; it is never auto-detected.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// `GET /admin/api.php?summary` without a credential.
    Legacy,
    /// `GET /admin/api.php?summary` with the token as a query parameter.
    LegacyToken,
    /// Pi-hole v6 session exchange: login, fetch, logout.
    Session,
}

/// Runtime settings loaded from environment variables.
#[derive(Parser, Debug, Clone)]
#[command(name = "pihole-influx")]
#[command(about = "Pi-hole statistics to InfluxDB 2 uploader")]
#[command(version)]
pub struct Settings {
    /// Comma-separated `host:port:token:name` list, or the literal `file`
    /// to read the hosts file instead.
    #[arg(long, env = "PIHOLE_HOSTS")]
    pub pihole_hosts: String,

    /// JSON hosts file used when PIHOLE_HOSTS is `file`.
    #[arg(long, env = "PIHOLE_HOSTS_FILE", default_value = "etc/pihole_hosts")]
    pub pihole_hosts_file: String,

    /// Pi-hole API generation spoken to every host.
    #[arg(long, env = "PIHOLE_API_VERSION", value_enum, default_value = "session")]
    pub api_version: ApiVersion,

    /// InfluxDB base URL, e.g. `http://influxdb:8086`.
    #[arg(long, env = "INFLUX_URL", required_unless_present = "test")]
    pub influx_url: Option<String>,

    /// InfluxDB organization.
    #[arg(long, env = "INFLUX_ORGANIZATION", required_unless_present = "test")]
    pub influx_organization: Option<String>,

    /// InfluxDB bucket receiving the points.
    #[arg(long, env = "INFLUX_BUCKET", required_unless_present = "test")]
    pub influx_bucket: Option<String>,

    /// InfluxDB API token.
    #[arg(long, env = "INFLUX_TOKEN", required_unless_present = "test")]
    pub influx_token: Option<String>,

    /// Value of the `service` tag attached to every point.
    #[arg(long, env = "INFLUX_SERVICE_TAG", default_value = "pihole")]
    pub service_tag: String,

    /// Seconds between polling cycles.
    #[arg(long, env = "RUN_EVERY_SECONDS", default_value_t = 60)]
    pub run_every_seconds: u64,

    /// Timeout in seconds applied to every HTTP request.
    #[arg(long, env = "HTTP_TIMEOUT_SECONDS", default_value_t = 10)]
    pub http_timeout_seconds: u64,

    /// Path of the OK/FAILED sentinel file read by external monitors.
    #[arg(long, env = "HEALTHCHECK_FILE", default_value = "healthcheck")]
    pub healthcheck_file: String,

    /// Whether a failed session logout marks the cycle as failed.
    #[arg(long, env = "STRICT_LOGOUT", default_value_t = true, action = ArgAction::Set)]
    pub strict_logout: bool,

    /// Enable debug logging.
    #[arg(long, env = "VERBOSE", default_value_t = false, action = ArgAction::Set)]
    pub verbose: bool,

    /// Just print the results without uploading to InfluxDB.
    #[arg(short, long)]
    pub test: bool,
}

impl Settings {
    /// Polling interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.run_every_seconds)
    }

    /// Per-request HTTP timeout as a [`Duration`].
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}
