//! The monitoring cycle: one pass over every watched address per
//! trigger. A single cutoff and a single deadline are computed up
//! front; every per-address and per-transfer failure is recorded and
//! stepped over, never propagated.

use std::time::Duration;

use chrono::Utc;
use metrics::{counter, histogram};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use treasury_watch_domain::alerts::{AlertError, AlertSink, Mailbox};
use treasury_watch_domain::config::WatchConfig;
use treasury_watch_domain::model::{AddressBook, TimeWindow, TransferRecord, WatchedAddress};

use crate::alert::build_alert;
use crate::report::{
    AddressOutcome, AlertOutcome, CycleReport, DeliveryOutcome, ScreeningVerdict,
};
use crate::source::TransactionSource;

/// Everything one cycle needs, detached from the environment so tests
/// construct it synthetically.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub addresses: AddressBook,
    pub start_block: u64,
    /// Boundary padding already applied by config loading.
    pub lookback_minutes: u64,
    pub recipients: Vec<Mailbox>,
    pub template_id: String,
    pub display_timezone: Option<String>,
    pub cycle_deadline: Duration,
}

impl CycleSettings {
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            addresses: config.addresses().clone(),
            start_block: config.start_block(),
            lookback_minutes: config.lookback_minutes(),
            recipients: config.recipients().to_vec(),
            template_id: config.sendgrid_template_id().to_string(),
            display_timezone: config.display_timezone().map(str::to_string),
            cycle_deadline: config.cycle_deadline(),
        }
    }
}

/// Runs one full cycle. Never fails: fetch and delivery problems are
/// per-unit outcomes in the returned report, and the report always
/// lists every configured address.
pub async fn run_cycle(
    settings: &CycleSettings,
    source: &dyn TransactionSource,
    sink: &dyn AlertSink,
) -> CycleReport {
    let window = TimeWindow::looking_back(Utc::now(), settings.lookback_minutes);
    let deadline = Instant::now() + settings.cycle_deadline;

    counter!("monitor_cycles_total").increment(1);
    info!(
        cutoff = %window.cutoff(),
        addresses = settings.addresses.len(),
        "cycle started"
    );

    let mut report = CycleReport::new(window.cutoff());

    for watched in settings.addresses.iter() {
        if Instant::now() >= deadline {
            warn!(name = %watched.name, "cycle deadline expired before fetch");
            counter!("monitor_fetches_total", "result" => "deadline").increment(1);
            report.record(watched.clone(), AddressOutcome::DeadlineExpired);
            continue;
        }

        let fetched = match timeout_at(
            deadline,
            source.recent_transactions(watched.address, settings.start_block),
        )
        .await
        {
            Ok(Ok(records)) => {
                counter!("monitor_fetches_total", "result" => "ok").increment(1);
                histogram!("monitor_fetch_batch_size").record(records.len() as f64);
                records
            }
            Ok(Err(error)) => {
                warn!(name = %watched.name, %error, "transaction fetch failed");
                counter!("monitor_fetches_total", "result" => "error").increment(1);
                report.record(watched.clone(), AddressOutcome::FetchFailed { error });
                continue;
            }
            Err(_) => {
                warn!(name = %watched.name, "transaction fetch abandoned at deadline");
                counter!("monitor_fetches_total", "result" => "deadline").increment(1);
                report.record(watched.clone(), AddressOutcome::DeadlineExpired);
                continue;
            }
        };

        let fetched_count = fetched.len();
        let qualifying = screen_batch(&fetched, &window, &settings.addresses);

        if qualifying.is_empty() {
            info!(
                name = %watched.name,
                fetched = fetched_count,
                "no new activity"
            );
            report.record(
                watched.clone(),
                AddressOutcome::Screened {
                    fetched: fetched_count,
                    alerts: Vec::new(),
                },
            );
            continue;
        }

        info!(
            name = %watched.name,
            count = qualifying.len(),
            "new transactions from unknown senders"
        );

        let mut alerts = Vec::with_capacity(qualifying.len());
        for record in qualifying {
            let delivery = deliver_one(&record, watched, settings, sink, deadline).await;
            alerts.push(AlertOutcome {
                hash: record.hash,
                delivery,
            });
        }

        report.record(
            watched.clone(),
            AddressOutcome::Screened {
                fetched: fetched_count,
                alerts,
            },
        );
    }

    report
}

/// Keeps transfers that are strictly newer than the cutoff and not sent
/// by a watched address, in source order. Emits one verdict metric per
/// record; value and recipient are never inspected here.
fn screen_batch(
    records: &[TransferRecord],
    window: &TimeWindow,
    book: &AddressBook,
) -> Vec<TransferRecord> {
    let mut qualifying = Vec::new();
    for record in records {
        let verdict = if !window.covers(record.timestamp) {
            ScreeningVerdict::Stale
        } else if book.contains(record.from) {
            ScreeningVerdict::Whitelisted
        } else {
            ScreeningVerdict::Qualified
        };

        debug!(
            hash = %record.hash,
            timestamp = %record.timestamp,
            verdict = verdict.as_ref(),
            "screened transfer"
        );
        counter!(
            "monitor_transfers_screened_total",
            "verdict" => verdict.as_ref().to_string()
        )
        .increment(1);

        if verdict == ScreeningVerdict::Qualified {
            qualifying.push(record.clone());
        }
    }
    qualifying
}

async fn deliver_one(
    record: &TransferRecord,
    watched: &WatchedAddress,
    settings: &CycleSettings,
    sink: &dyn AlertSink,
    deadline: Instant,
) -> DeliveryOutcome {
    if Instant::now() >= deadline {
        warn!(hash = %record.hash, "cycle deadline expired before delivery");
        counter!("monitor_alerts_total", "result" => "deadline").increment(1);
        return DeliveryOutcome::Failed(AlertError::DeadlineExpired);
    }

    let message = build_alert(
        record,
        watched,
        &settings.recipients,
        &settings.template_id,
        settings.display_timezone.as_deref(),
    );

    match timeout_at(deadline, sink.deliver(&message)).await {
        Ok(Ok(receipt)) => {
            info!(hash = %record.hash, status = receipt.status, "alert sent");
            counter!("monitor_alerts_total", "result" => "sent").increment(1);
            DeliveryOutcome::Sent(receipt)
        }
        Ok(Err(error)) => {
            warn!(hash = %record.hash, %error, "alert delivery failed");
            counter!("monitor_alerts_total", "result" => "failed").increment(1);
            DeliveryOutcome::Failed(error)
        }
        Err(_) => {
            warn!(hash = %record.hash, "alert delivery abandoned at deadline");
            counter!("monitor_alerts_total", "result" => "deadline").increment(1);
            DeliveryOutcome::Failed(AlertError::DeadlineExpired)
        }
    }
}
