//! Failure isolation modeled as data: every unit of work in a cycle
//! (one address fetch, one alert delivery) lands in the report as a
//! tagged outcome instead of being represented by log lines alone.

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use strum_macros::AsRefStr;

use treasury_watch_domain::alerts::{AlertError, DeliveryReceipt};
use treasury_watch_domain::model::WatchedAddress;

use crate::source::SourceError;

/// What screening decided about one transfer. The tag doubles as the
/// metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ScreeningVerdict {
    /// Inside the window and from an unknown sender; will be alerted.
    Qualified,
    /// At or before the cutoff.
    Stale,
    /// Sent by another watched address.
    Whitelisted,
}

/// One delivery attempt for one qualifying transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent(DeliveryReceipt),
    Failed(AlertError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertOutcome {
    pub hash: B256,
    pub delivery: DeliveryOutcome,
}

/// What happened to one address during the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressOutcome {
    /// The fetch failed; the address is retried naturally next cycle.
    FetchFailed { error: SourceError },
    /// The cycle deadline expired before this address could be fetched.
    DeadlineExpired,
    /// The fetch succeeded; `alerts` holds one outcome per qualifying
    /// transfer, empty when nothing qualified.
    Screened {
        fetched: usize,
        alerts: Vec<AlertOutcome>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressReport {
    pub address: WatchedAddress,
    pub outcome: AddressOutcome,
}

/// Aggregated result of one full cycle. Owned exclusively by the cycle
/// while it runs; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    cutoff: DateTime<Utc>,
    addresses: Vec<AddressReport>,
}

impl CycleReport {
    pub fn new(cutoff: DateTime<Utc>) -> Self {
        Self {
            cutoff,
            addresses: Vec::new(),
        }
    }

    pub fn record(&mut self, address: WatchedAddress, outcome: AddressOutcome) {
        self.addresses.push(AddressReport { address, outcome });
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Per-address outcomes in processing (= configuration) order.
    pub fn addresses(&self) -> &[AddressReport] {
        &self.addresses
    }

    pub fn alerts_sent(&self) -> usize {
        self.alert_outcomes()
            .filter(|alert| matches!(alert.delivery, DeliveryOutcome::Sent(_)))
            .count()
    }

    pub fn alerts_failed(&self) -> usize {
        self.alert_outcomes()
            .filter(|alert| matches!(alert.delivery, DeliveryOutcome::Failed(_)))
            .count()
    }

    /// Addresses whose transactions could not be fetched at all,
    /// deadline expiries included.
    pub fn fetch_failures(&self) -> usize {
        self.addresses
            .iter()
            .filter(|report| {
                matches!(
                    report.outcome,
                    AddressOutcome::FetchFailed { .. } | AddressOutcome::DeadlineExpired
                )
            })
            .count()
    }

    /// One human-readable line per alert actually sent; the trigger
    /// handler returns these as the response body.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for report in &self.addresses {
            let AddressOutcome::Screened { alerts, .. } = &report.outcome else {
                continue;
            };
            for alert in alerts {
                if let DeliveryOutcome::Sent(receipt) = &alert.delivery {
                    lines.push(format!(
                        "alert sent for tx {} ({}): status {}",
                        alert.hash, report.address.name, receipt.status
                    ));
                }
            }
        }
        lines
    }

    fn alert_outcomes(&self) -> impl Iterator<Item = &AlertOutcome> {
        self.addresses.iter().flat_map(|report| {
            match &report.outcome {
                AddressOutcome::Screened { alerts, .. } => alerts.as_slice(),
                _ => &[],
            }
            .iter()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    fn watched(byte: u8, name: &str) -> WatchedAddress {
        WatchedAddress {
            address: Address::repeat_byte(byte),
            name: name.to_string(),
        }
    }

    fn sent(hash_byte: u8) -> AlertOutcome {
        AlertOutcome {
            hash: B256::repeat_byte(hash_byte),
            delivery: DeliveryOutcome::Sent(DeliveryReceipt {
                status: 202,
                body: String::new(),
            }),
        }
    }

    fn failed(hash_byte: u8) -> AlertOutcome {
        AlertOutcome {
            hash: B256::repeat_byte(hash_byte),
            delivery: DeliveryOutcome::Failed(AlertError::Rejected {
                status: 500,
                body: "boom".to_string(),
            }),
        }
    }

    #[test]
    fn counters_aggregate_across_addresses() {
        let mut report = CycleReport::new(Utc::now());
        report.record(
            watched(0xaa, "Treasury"),
            AddressOutcome::Screened {
                fetched: 3,
                alerts: vec![sent(1), failed(2)],
            },
        );
        report.record(
            watched(0xbb, "Payroll"),
            AddressOutcome::FetchFailed {
                error: SourceError::Transport("timeout".to_string()),
            },
        );
        report.record(watched(0xcc, "Reserve"), AddressOutcome::DeadlineExpired);

        assert_eq!(report.alerts_sent(), 1);
        assert_eq!(report.alerts_failed(), 1);
        assert_eq!(report.fetch_failures(), 2);
        assert_eq!(report.addresses().len(), 3);
    }

    #[test]
    fn summary_lists_sent_alerts_only() {
        let mut report = CycleReport::new(Utc::now());
        report.record(
            watched(0xaa, "Treasury"),
            AddressOutcome::Screened {
                fetched: 2,
                alerts: vec![sent(1), failed(2)],
            },
        );
        report.record(
            watched(0xbb, "Payroll"),
            AddressOutcome::Screened {
                fetched: 0,
                alerts: Vec::new(),
            },
        );

        let lines = report.summary_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Treasury"));
        assert!(lines[0].contains("status 202"));
    }

    #[test]
    fn verdict_tags_serialize_snake_case() {
        assert_eq!(ScreeningVerdict::Qualified.as_ref(), "qualified");
        assert_eq!(ScreeningVerdict::Stale.as_ref(), "stale");
        assert_eq!(ScreeningVerdict::Whitelisted.as_ref(), "whitelisted");
    }
}
