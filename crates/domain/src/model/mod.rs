//! Data structures and helpers shared across the API and monitor
//! binaries.

use alloy_primitives::utils::format_ether;
use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

/// One address under watch, as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedAddress {
    pub address: Address,
    pub name: String,
}

/// Errors emitted when the configured address list fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressBookError {
    #[error("address list is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("entry {index} (`{name}`) has an invalid address: {detail}")]
    InvalidAddress {
        index: usize,
        name: String,
        detail: String,
    },
    #[error("address {address} appears more than once")]
    Duplicate { address: Address },
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    address: String,
    name: String,
}

/// The configured set of watched addresses, in configuration order.
///
/// The same set doubles as the sender whitelist: screening asks
/// [`AddressBook::contains`] with each transfer's sender, so transfers
/// between watched addresses never alert. There is no mutation API;
/// the book is parsed once at startup and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBook {
    entries: Vec<WatchedAddress>,
}

impl AddressBook {
    /// Parses the configured `[{"address": "0x…", "name": "…"}]` array.
    /// Entries keep their configured order. Duplicates are rejected;
    /// since addresses are compared after parsing, two spellings of the
    /// same address in different hex casing still count as duplicates.
    pub fn from_json(raw: &str) -> Result<Self, AddressBookError> {
        let raw_entries: Vec<RawEntry> =
            serde_json::from_str(raw).map_err(|err| AddressBookError::InvalidJson(err.to_string()))?;

        let mut entries: Vec<WatchedAddress> = Vec::with_capacity(raw_entries.len());
        for (index, entry) in raw_entries.into_iter().enumerate() {
            let address = entry.address.parse::<Address>().map_err(|err| {
                AddressBookError::InvalidAddress {
                    index,
                    name: entry.name.clone(),
                    detail: err.to_string(),
                }
            })?;
            if entries.iter().any(|existing| existing.address == address) {
                return Err(AddressBookError::Duplicate { address });
            }
            entries.push(WatchedAddress {
                address,
                name: entry.name,
            });
        }

        Ok(Self { entries })
    }

    /// `true` if the sender is one of the watched addresses. Parsed
    /// addresses compare by their 20 bytes, so hex casing never
    /// matters.
    pub fn contains(&self, address: Address) -> bool {
        self.entries.iter().any(|entry| entry.address == address)
    }

    /// Iterates the book in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &WatchedAddress> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One on-chain transaction touching a watched address, as converted
/// from the transaction source. Never mutated after conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub hash: B256,
    pub from: Address,
    pub to: Address,
    /// Wei. Screening never looks at this; only the alert payload does.
    pub value: U256,
    pub timestamp: DateTime<Utc>,
}

/// The rolling recency boundary for one cycle. Only transfers strictly
/// newer than the cutoff are candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    cutoff: DateTime<Utc>,
}

impl TimeWindow {
    /// Window reaching `lookback_minutes` back from `now`. Computed
    /// once per cycle so every address is screened against the same
    /// cutoff.
    pub fn looking_back(now: DateTime<Utc>, lookback_minutes: u64) -> Self {
        Self {
            cutoff: now - Duration::minutes(lookback_minutes as i64),
        }
    }

    /// Strictly newer than the cutoff; a transfer exactly at the cutoff
    /// is outside the window.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        at > self.cutoff
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }
}

/// Renders a wei amount as a human ETH amount: fixed-point division by
/// 10^18 at full precision, then trailing zeros trimmed, so
/// `1500000000000000000` becomes `1.5` rather than
/// `1.500000000000000000`.
pub fn format_eth(value: U256) -> String {
    let rendered = format_ether(value);
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK_JSON: &str = r#"[
        {"address": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", "name": "Treasury"},
        {"address": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", "name": "Payroll"}
    ]"#;

    #[test]
    fn address_book_keeps_configuration_order() {
        let book = AddressBook::from_json(BOOK_JSON).expect("book parses");
        let names: Vec<&str> = book.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["Treasury", "Payroll"]);
        assert_eq!(book.len(), 2);
        assert!(!book.is_empty());
    }

    #[test]
    fn address_book_matches_senders_across_hex_casing() {
        let book = AddressBook::from_json(BOOK_JSON).expect("book parses");
        let lowercase_spelling = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
            .parse::<Address>()
            .unwrap();
        let uppercase_spelling = "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB"
            .parse::<Address>()
            .unwrap();
        assert!(book.contains(lowercase_spelling));
        assert!(book.contains(uppercase_spelling));
        assert!(!book.contains(Address::repeat_byte(0xcc)));
    }

    #[test]
    fn address_book_rejects_duplicates_regardless_of_casing() {
        let raw = r#"[
            {"address": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", "name": "one"},
            {"address": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "name": "two"}
        ]"#;
        let err = AddressBook::from_json(raw).unwrap_err();
        assert!(matches!(err, AddressBookError::Duplicate { .. }));
    }

    #[test]
    fn address_book_rejects_malformed_input() {
        assert!(matches!(
            AddressBook::from_json("not json").unwrap_err(),
            AddressBookError::InvalidJson(_)
        ));

        let bad_address = r#"[{"address": "0x1234", "name": "Short"}]"#;
        let err = AddressBook::from_json(bad_address).unwrap_err();
        assert!(matches!(
            err,
            AddressBookError::InvalidAddress { index: 0, .. }
        ));
    }

    #[test]
    fn window_covers_strictly_newer_instants_only() {
        let now = Utc::now();
        let window = TimeWindow::looking_back(now, 31);

        assert!(window.covers(now));
        assert!(window.covers(now - Duration::minutes(29)));
        assert!(!window.covers(window.cutoff()));
        assert!(!window.covers(now - Duration::minutes(31)));
        assert!(!window.covers(now - Duration::hours(5)));
    }

    #[test]
    fn wei_rendering_trims_fixed_point() {
        let one_and_a_half: U256 = "1500000000000000000".parse().unwrap();
        assert_eq!(format_eth(one_and_a_half), "1.5");

        let three: U256 = "3000000000000000000".parse().unwrap();
        assert_eq!(format_eth(three), "3");

        assert_eq!(format_eth(U256::ZERO), "0");
        assert_eq!(format_eth(U256::from(1u64)), "0.000000000000000001");
        assert_eq!(
            format_eth(U256::from(1_000_000_000_000u64)),
            "0.000001"
        );
    }
}
