//! Dev/CI binary that runs exactly one monitoring cycle against the
//! real Etherscan source and SendGrid sink, then prints the report.
//! Production prefers the API process, which runs cycles in-process per
//! trigger.

use std::io;

use thiserror::Error;

use treasury_watch_domain::config::{ConfigError, WatchConfig};
use treasury_watch_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use treasury_watch_monitor::{run_cycle, CycleSettings, EtherscanSource};
use treasury_watch_notify::SendGridMailer;

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(err) = bootstrap().await {
        eprintln!("[monitor] bootstrap failed: {err}");
        return Err(io::Error::other(err.to_string()));
    }

    Ok(())
}

async fn bootstrap() -> Result<(), MonitorError> {
    let config = WatchConfig::load_from_env()?;
    let telemetry_config = TelemetryConfig::from_env("MONITOR");
    init_telemetry(&telemetry_config)?;

    let client = reqwest::Client::builder()
        .build()
        .map_err(|err| MonitorError::Http(err.to_string()))?;
    let source = EtherscanSource::new(
        client.clone(),
        config.etherscan_api_url(),
        config.etherscan_api_key(),
    );
    let sink = SendGridMailer::new(
        client,
        config.sendgrid_api_url(),
        config.sendgrid_api_key(),
        config.sender().clone(),
    );

    let settings = CycleSettings::from_config(&config);
    let report = run_cycle(&settings, &source, &sink).await;

    for line in report.summary_lines() {
        println!("{line}");
    }
    println!(
        "cycle complete: {} sent, {} failed, {} fetch failures across {} addresses",
        report.alerts_sent(),
        report.alerts_failed(),
        report.fetch_failures(),
        report.addresses().len()
    );

    Ok(())
}

#[derive(Debug, Error)]
enum MonitorError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("http client error: {0}")]
    Http(String),
}
