//! Wire types for the Etherscan `account/txlist` endpoint and their
//! conversion into domain [`TransferRecord`]s.

use alloy_primitives::{Address, B256, U256};
use chrono::DateTime;
use serde::Deserialize;
use treasury_watch_domain::model::TransferRecord;

use crate::source::SourceError;

/// The `{status, message, result}` envelope every Etherscan response
/// carries. `result` is a transaction list on success but a bare string
/// on API-level errors (bad key, rate limit), so it deserializes into
/// either shape.
#[derive(Debug, Deserialize)]
pub struct TxListEnvelope {
    pub status: String,
    pub message: String,
    pub result: TxListResult,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TxListResult {
    Entries(Vec<RawTransaction>),
    Detail(String),
}

/// One normal transaction as Etherscan returns it: every field is a
/// string, numerics in decimal. Fields we never read are left
/// undeclared and skipped by serde.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: String,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
}

/// Converts a raw wire entry into a [`TransferRecord`]. Any unparseable
/// field fails the conversion, which fails the whole fetch for that
/// address (recoverable at the cycle level).
pub fn convert_transaction(raw: RawTransaction) -> Result<TransferRecord, SourceError> {
    let hash = parse_field::<B256>(&raw.hash, "hash", &raw.hash)?;
    let from = parse_field::<Address>(&raw.hash, "from", &raw.from)?;
    // Contract creations leave `to` empty.
    let to = if raw.to.is_empty() {
        Address::ZERO
    } else {
        parse_field::<Address>(&raw.hash, "to", &raw.to)?
    };
    let value = parse_field::<U256>(&raw.hash, "value", &raw.value)?;

    let seconds =
        raw.time_stamp
            .parse::<i64>()
            .map_err(|err| SourceError::Conversion {
                hash: raw.hash.clone(),
                field: "timeStamp",
                detail: err.to_string(),
            })?;
    let timestamp =
        DateTime::from_timestamp(seconds, 0).ok_or_else(|| SourceError::Conversion {
            hash: raw.hash.clone(),
            field: "timeStamp",
            detail: format!("{seconds} is out of range"),
        })?;

    Ok(TransferRecord {
        hash,
        from,
        to,
        value,
        timestamp,
    })
}

fn parse_field<T>(hash: &str, field: &'static str, raw: &str) -> Result<T, SourceError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|err: T::Err| SourceError::Conversion {
        hash: hash.to_string(),
        field,
        detail: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_raw() -> RawTransaction {
        RawTransaction {
            hash: "0xc3d224630a6f59856302e592d329953df0b2a057693906976e5019df6347320d"
                .to_string(),
            from: "0x1111111111111111111111111111111111111111".to_string(),
            to: "0x2222222222222222222222222222222222222222".to_string(),
            value: "1500000000000000000".to_string(),
            time_stamp: "1700000000".to_string(),
        }
    }

    #[test]
    fn converts_raw_transaction_into_record() {
        let record = convert_transaction(sample_raw()).expect("conversion succeeds");
        assert_eq!(
            record.from,
            "0x1111111111111111111111111111111111111111"
                .parse::<Address>()
                .unwrap()
        );
        assert_eq!(record.value, "1500000000000000000".parse::<U256>().unwrap());
        assert_eq!(
            record.timestamp,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap()
        );
    }

    #[test]
    fn empty_to_is_treated_as_contract_creation() {
        let mut raw = sample_raw();
        raw.to = String::new();
        let record = convert_transaction(raw).expect("conversion succeeds");
        assert_eq!(record.to, Address::ZERO);
    }

    #[test]
    fn bad_numeric_fields_fail_conversion() {
        let mut raw = sample_raw();
        raw.value = "one point five".to_string();
        let err = convert_transaction(raw).unwrap_err();
        assert!(matches!(
            err,
            SourceError::Conversion { field: "value", .. }
        ));

        let mut raw = sample_raw();
        raw.time_stamp = "soon".to_string();
        let err = convert_transaction(raw).unwrap_err();
        assert!(matches!(
            err,
            SourceError::Conversion {
                field: "timeStamp",
                ..
            }
        ));
    }

    #[test]
    fn envelope_deserializes_both_result_shapes() {
        let ok = r#"{
            "status": "1",
            "message": "OK",
            "result": [{
                "hash": "0xc3d224630a6f59856302e592d329953df0b2a057693906976e5019df6347320d",
                "from": "0x1111111111111111111111111111111111111111",
                "to": "0x2222222222222222222222222222222222222222",
                "value": "1",
                "timeStamp": "1700000000",
                "blockNumber": "18000000",
                "gasUsed": "21000"
            }]
        }"#;
        let envelope: TxListEnvelope = serde_json::from_str(ok).expect("ok envelope parses");
        assert!(matches!(envelope.result, TxListResult::Entries(ref e) if e.len() == 1));

        let err = r#"{
            "status": "0",
            "message": "NOTOK",
            "result": "Invalid API Key"
        }"#;
        let envelope: TxListEnvelope = serde_json::from_str(err).expect("error envelope parses");
        assert!(matches!(envelope.result, TxListResult::Detail(ref d) if d == "Invalid API Key"));
    }
}
