//! The polling cycle: fetch, normalize, publish, track health.
//!
//! Hosts are processed strictly in registry order within a cycle; a slow
//! host delays all subsequent hosts until its timeout elapses. A host-level
//! failure is logged and the loop proceeds to the next host; the next
//! opportunity to succeed is the next scheduled cycle.

use crate::api::{self, ApiError};
use crate::config::Settings;
use crate::health::HealthTracker;
use crate::registry::HostConfig;
use crate::sink::{Output, SinkError};
use crate::stats::{self, StatsError};

use chrono::Utc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};

/// Why a host's contribution to a cycle failed.
#[derive(Error, Debug)]
pub enum HostError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Normalize(#[from] StatsError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Per-cycle aggregate, recomputed from scratch every cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleResult {
    pub any_failure: bool,
    pub hosts_ok: usize,
    pub hosts_failed: usize,
}

impl CycleResult {
    fn record(mut self, outcome: &Result<(), HostError>) -> Self {
        match outcome {
            Ok(()) => self.hosts_ok += 1,
            Err(_) => {
                self.any_failure = true;
                self.hosts_failed += 1;
            }
        }
        self
    }
}

/// Poll every host once, in registry order, folding per-host outcomes into
/// the cycle aggregate.
pub async fn run_cycle(settings: &Settings, hosts: &[HostConfig], output: &Output) -> CycleResult {
    let mut result = CycleResult::default();
    for host in hosts {
        let outcome = poll_host(settings, host, output).await;
        if let Err(e) = &outcome {
            tracing::error!("{}: {}", host.label(), e);
        }
        result = result.record(&outcome);
    }
    result
}

/// Fetch, normalize and publish the statistics of a single host.
async fn poll_host(
    settings: &Settings,
    host: &HostConfig,
    output: &Output,
) -> Result<(), HostError> {
    tracing::debug!("collecting data for {}", host.label());
    let payload = api::fetch_stats(
        settings.api_version,
        host,
        settings.http_timeout(),
        settings.strict_logout,
    )
    .await?;

    let (stats, gravity) = stats::normalize(settings.api_version, &payload, Utc::now())?;

    tracing::debug!("uploading data for {}", host.label());
    output
        .publish(host, &settings.service_tag, &stats, &gravity)
        .await?;
    Ok(())
}

/// Time left to sleep after a cycle. Never negative: a cycle that outran
/// the interval starts the next one immediately.
pub fn remaining_sleep(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Run cycles forever, sleeping out the remainder of each interval, until
/// SIGTERM or ctrl-c.
pub async fn run(
    settings: &Settings,
    hosts: &[HostConfig],
    output: &Output,
    health: &mut HealthTracker,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let interval = settings.poll_interval();

    loop {
        let started = Instant::now();

        let result = tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received, shutting down..");
                return Ok(());
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, shutting down..");
                return Ok(());
            }
            result = run_cycle(settings, hosts, output) => result,
        };

        if let Err(e) = health.observe_cycle(result.any_failure) {
            tracing::error!("{}", e);
        }

        let elapsed = started.elapsed();
        tracing::debug!(
            "cycle finished: {} ok, {} failed, took {:.1}s",
            result.hosts_ok,
            result.hosts_failed,
            elapsed.as_secs_f64()
        );

        let pause = remaining_sleep(interval, elapsed);
        if !pause.is_zero() {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("SIGTERM received, shutting down..");
                    return Ok(());
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received, shutting down..");
                    return Ok(());
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiVersion;
    use clap::Parser;

    #[test]
    fn test_remaining_sleep() {
        assert_eq!(
            remaining_sleep(Duration::from_secs(10), Duration::from_secs(3)),
            Duration::from_secs(7)
        );
        assert_eq!(
            remaining_sleep(Duration::from_secs(10), Duration::from_secs(12)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_cycle_result_fold() {
        let ok: Result<(), HostError> = Ok(());
        let failed: Result<(), HostError> = Err(HostError::Api(ApiError::MissingToken));

        let result = CycleResult::default()
            .record(&ok)
            .record(&failed)
            .record(&ok);

        assert!(result.any_failure);
        assert_eq!(result.hosts_ok, 2);
        assert_eq!(result.hosts_failed, 1);
    }

    #[tokio::test]
    async fn test_run_cycle_marks_unreachable_host_failed() {
        let settings = Settings::try_parse_from([
            "pihole-influx",
            "--pihole-hosts",
            "127.0.0.1:9:dns1",
            "--api-version",
            "legacy",
            "--http-timeout-seconds",
            "1",
            "--test",
        ])
        .unwrap();
        assert_eq!(settings.api_version, ApiVersion::Legacy);

        let hosts = crate::registry::parse_inline(&settings.pihole_hosts).unwrap();
        let result = run_cycle(&settings, &hosts, &Output::Stdout).await;

        assert!(result.any_failure);
        assert_eq!(result.hosts_failed, 1);
        assert_eq!(result.hosts_ok, 0);
    }
}
