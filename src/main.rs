//! pihole-influx - Pi-hole statistics collector for InfluxDB 2.
//!
//! Polls one or more Pi-hole instances on a fixed interval, normalizes
//! their statistics and uploads them to an InfluxDB 2 bucket, maintaining
//! an OK/FAILED healthcheck file for external monitors.

mod api;
mod collector;
mod config;
mod health;
mod registry;
mod sink;
mod stats;

use clap::Parser;
use config::Settings;
use health::HealthTracker;
use sink::{InfluxSink, Output};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::parse();

    // Initialize logging
    let default_level = if settings.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("pihole_influx={default_level}").parse()?),
        )
        .init();

    tracing::info!("PIHOLE_HOSTS = <{}>", settings.pihole_hosts);

    // A registry error is fatal: the loop never starts with a partial
    // host list.
    let hosts = registry::load(&settings)?;
    println!(
        "PIHOLE_HOSTS definition:\n{}",
        serde_json::to_string_pretty(&hosts)?
    );

    let output = if settings.test {
        tracing::info!("Test mode: printing results instead of uploading");
        Output::Stdout
    } else {
        match InfluxSink::from_settings(&settings) {
            Some(sink) => Output::Influx(sink),
            None => {
                return Err(
                    "INFLUX_URL, INFLUX_ORGANIZATION, INFLUX_BUCKET and INFLUX_TOKEN are required"
                        .into(),
                )
            }
        }
    };

    tracing::info!(
        "Starting: {} hosts, polling every {}s",
        hosts.len(),
        settings.run_every_seconds
    );
    tracing::debug!("Healthcheck file => {}", settings.healthcheck_file);

    let mut health = HealthTracker::new(&settings.healthcheck_file)?;

    collector::run(&settings, &hosts, &output, &mut health).await
}
