//! Builds the rendered alert for one qualifying transfer. The cycle
//! owns what goes out; the sink only carries it.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use treasury_watch_domain::alerts::{AlertFields, AlertMessage, Mailbox};
use treasury_watch_domain::model::{format_eth, TransferRecord, WatchedAddress};

const SUBJECT: &str = "New incoming Ethereum transaction";
const TITLE: &str = "Unexpected transfer to a watched address";
const LINK_TEXT: &str = "View transaction";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Renders one alert for one transfer against one watched address.
pub fn build_alert(
    record: &TransferRecord,
    watched: &WatchedAddress,
    recipients: &[Mailbox],
    template_id: &str,
    display_timezone: Option<&str>,
) -> AlertMessage {
    AlertMessage {
        recipients: recipients.to_vec(),
        template_id: template_id.to_string(),
        fields: AlertFields {
            subject: SUBJECT.to_string(),
            title: TITLE.to_string(),
            amount: format!("{} ETH", format_eth(record.value)),
            address: format!("{} - {}", watched.address, watched.name),
            time: render_timestamp(record.timestamp, display_timezone),
            return_link_text: LINK_TEXT.to_string(),
            return_link_url: format!("https://etherscan.io/tx/{}", record.hash),
        },
    }
}

/// Renders the transfer timestamp in the configured display timezone.
/// An unresolvable timezone name falls back to UTC silently; a bad
/// display preference must never fail an alert.
fn render_timestamp(at: DateTime<Utc>, display_timezone: Option<&str>) -> String {
    if let Some(name) = display_timezone {
        if let Ok(tz) = name.parse::<Tz>() {
            return at.with_timezone(&tz).format(TIME_FORMAT).to_string();
        }
    }
    at.format(TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, U256};
    use chrono::TimeZone;

    fn sample_record() -> TransferRecord {
        TransferRecord {
            hash: B256::repeat_byte(0xde),
            from: Address::repeat_byte(0x11),
            to: Address::repeat_byte(0xaa),
            value: "1500000000000000000".parse().unwrap(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        }
    }

    fn sample_watched() -> WatchedAddress {
        WatchedAddress {
            address: Address::repeat_byte(0xaa),
            name: "Treasury".to_string(),
        }
    }

    #[test]
    fn renders_all_template_fields() {
        let recipients = vec![Mailbox::new("ops@example.com")];
        let message = build_alert(
            &sample_record(),
            &sample_watched(),
            &recipients,
            "d-template",
            None,
        );

        assert_eq!(message.template_id, "d-template");
        assert_eq!(message.recipients, recipients);
        assert_eq!(message.fields.amount, "1.5 ETH");
        assert!(message.fields.address.ends_with(" - Treasury"));
        assert!(message
            .fields
            .address
            .to_lowercase()
            .starts_with("0xaaaaaaaa"));
        assert_eq!(
            message.fields.return_link_url,
            format!("https://etherscan.io/tx/{}", B256::repeat_byte(0xde))
        );
        assert_eq!(message.fields.time, "2024-01-15 00:00:00 UTC");
    }

    #[test]
    fn timestamp_honors_display_timezone() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        // Sydney is UTC+11 in January.
        assert_eq!(
            render_timestamp(at, Some("Australia/Sydney")),
            "2024-01-15 11:00:00 AEDT"
        );
    }

    #[test]
    fn unresolvable_timezone_falls_back_to_utc() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(
            render_timestamp(at, Some("Atlantis/Lost_City")),
            "2024-01-15 00:00:00 UTC"
        );
        assert_eq!(render_timestamp(at, None), "2024-01-15 00:00:00 UTC");
    }
}
