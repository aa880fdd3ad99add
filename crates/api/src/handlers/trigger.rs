use actix_web::{web::Data, HttpResponse};
use metrics::counter;
use tracing::info;

use treasury_watch_monitor::run_cycle;

use crate::state::AppState;

/// `GET /` — the scheduler's trigger. No body, no parameters. Runs one
/// full cycle and answers `200 OK` with one line per alert sent;
/// per-address and per-transfer failures are visible in logs and
/// metrics but never change the response status.
pub async fn trigger_handler(state: Data<AppState>) -> HttpResponse {
    counter!("api_cycle_requests_total").increment(1);

    let report = run_cycle(state.settings(), state.source(), state.sink()).await;

    info!(
        sent = report.alerts_sent(),
        failed = report.alerts_failed(),
        fetch_failures = report.fetch_failures(),
        "cycle finished"
    );

    let mut body = report.summary_lines().join("\n");
    if !body.is_empty() {
        body.push('\n');
    }

    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(body)
}
