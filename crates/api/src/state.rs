use std::sync::Arc;

use treasury_watch_domain::alerts::AlertSink;
use treasury_watch_domain::services::telemetry::TelemetryGuard;
use treasury_watch_monitor::{CycleSettings, TransactionSource};

/// Shared handler state. Source and sink are trait objects so tests can
/// inject scripted implementations behind the same routes.
#[derive(Clone)]
pub struct AppState {
    settings: Arc<CycleSettings>,
    source: Arc<dyn TransactionSource>,
    sink: Arc<dyn AlertSink>,
    telemetry: TelemetryGuard,
}

impl AppState {
    pub fn new(
        settings: CycleSettings,
        source: Arc<dyn TransactionSource>,
        sink: Arc<dyn AlertSink>,
        telemetry: TelemetryGuard,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            source,
            sink,
            telemetry,
        }
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    pub fn source(&self) -> &dyn TransactionSource {
        self.source.as_ref()
    }

    pub fn sink(&self) -> &dyn AlertSink {
        self.sink.as_ref()
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }
}
