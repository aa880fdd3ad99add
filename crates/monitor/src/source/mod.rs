//! The transaction-source boundary: where candidate transactions come
//! from. Production talks to Etherscan; tests substitute scripted
//! sources.

use alloy_primitives::Address;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use treasury_watch_domain::model::TransferRecord;

mod types;

pub use types::{convert_transaction, RawTransaction, TxListEnvelope, TxListResult};

/// Errors a fetch can produce. All of them are recoverable at the cycle
/// level: they fail one address for one cycle, nothing more.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The request never produced a well-formed answer.
    #[error("transport error: {0}")]
    Transport(String),
    /// Etherscan answered with an API-level error status.
    #[error("etherscan error `{message}`: {detail}")]
    Api { message: String, detail: String },
    /// A returned entry could not be converted into a transfer record.
    #[error("malformed `{field}` in transaction {hash}: {detail}")]
    Conversion {
        hash: String,
        field: &'static str,
        detail: String,
    },
}

impl SourceError {
    pub fn from_transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Supplies recent transactions for one address, ascending by block,
/// unbounded at the top, starting at the configured origin block.
/// Implementations must not filter by recency or sender; screening is
/// the cycle's job.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn recent_transactions(
        &self,
        address: Address,
        start_block: u64,
    ) -> Result<Vec<TransferRecord>, SourceError>;
}

/// Etherscan `account/txlist` client. Normal transactions only;
/// internal transactions are a different action and deliberately not
/// fetched.
pub struct EtherscanSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl EtherscanSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl TransactionSource for EtherscanSource {
    async fn recent_transactions(
        &self,
        address: Address,
        start_block: u64,
    ) -> Result<Vec<TransferRecord>, SourceError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", &address.to_string()),
                ("startblock", &start_block.to_string()),
                ("sort", "asc"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await
            .map_err(SourceError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Transport(format!("http {status}: {body}")));
        }

        let envelope: TxListEnvelope = response
            .json()
            .await
            .map_err(SourceError::from_transport)?;

        debug!(
            %address,
            status = %envelope.status,
            message = %envelope.message,
            "etherscan txlist response"
        );

        parse_envelope(envelope)
    }
}

/// Interprets the Etherscan envelope. An explicit "No transactions
/// found" answer is empty-success: an idle account is not a failure.
pub fn parse_envelope(envelope: TxListEnvelope) -> Result<Vec<TransferRecord>, SourceError> {
    if envelope.status == "1" {
        return match envelope.result {
            TxListResult::Entries(entries) => {
                entries.into_iter().map(convert_transaction).collect()
            }
            TxListResult::Detail(detail) => Err(SourceError::Api {
                message: envelope.message,
                detail,
            }),
        };
    }

    if envelope.message.starts_with("No transactions found") {
        return Ok(Vec::new());
    }

    let detail = match envelope.result {
        TxListResult::Detail(detail) => detail,
        TxListResult::Entries(_) => String::new(),
    };
    Err(SourceError::Api {
        message: envelope.message,
        detail,
    })
}
