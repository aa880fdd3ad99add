use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use thiserror::Error;

use treasury_watch_domain::alerts::AlertSink;
use treasury_watch_domain::config::{ApiConfig, ConfigError, WatchConfig};
use treasury_watch_domain::services::telemetry::{
    init_telemetry, TelemetryConfig, TelemetryError,
};
use treasury_watch_monitor::{CycleSettings, EtherscanSource, TransactionSource};
use treasury_watch_notify::SendGridMailer;

use crate::{
    handlers::{metrics_handler, trigger_handler},
    state::AppState,
};

pub async fn run() -> Result<(), BootstrapError> {
    let api_config = ApiConfig::load_from_env()?;
    let watch_config = WatchConfig::load_from_env()?;

    let telemetry_config = TelemetryConfig::from_env("API");
    let telemetry = init_telemetry(&telemetry_config)?;

    // One client shared by both outbound integrations.
    let client = reqwest::Client::builder()
        .build()
        .map_err(|err| BootstrapError::HttpClient(err.to_string()))?;
    let source: Arc<dyn TransactionSource> = Arc::new(EtherscanSource::new(
        client.clone(),
        watch_config.etherscan_api_url(),
        watch_config.etherscan_api_key(),
    ));
    let sink: Arc<dyn AlertSink> = Arc::new(SendGridMailer::new(
        client,
        watch_config.sendgrid_api_url(),
        watch_config.sendgrid_api_key(),
        watch_config.sender().clone(),
    ));

    let state = AppState::new(
        CycleSettings::from_config(&watch_config),
        source,
        sink,
        telemetry.clone(),
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .route("/", web::get().to(trigger_handler))
            .route("/metrics", web::get().to(metrics_handler))
    })
    .bind(api_config.api_bind_address())?
    .run()
    .await?;

    Ok(())
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("http client error: {0}")]
    HttpClient(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
