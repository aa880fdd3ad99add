//! The delivery contract between the monitoring core and whatever sends
//! alerts on its behalf. The core decides *what* goes out (recipients,
//! template, rendered field values); an [`AlertSink`] implementation
//! decides *how*. Production uses the SendGrid sink in `crates/notify`,
//! tests substitute recording mocks.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Common result alias for alert delivery.
pub type AlertResult<T> = Result<T, AlertError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlertError {
    /// The request never produced an answer from the provider.
    #[error("transport error: {0}")]
    Transport(String),
    /// The provider answered with a non-success status.
    #[error("delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    /// The cycle deadline expired before the delivery resolved.
    #[error("delivery abandoned: cycle deadline expired")]
    DeadlineExpired,
}

impl AlertError {
    pub fn from_transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// One email endpoint, serialized in the provider's `{email, name}`
/// shape.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Mailbox {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Mailbox {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn named(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }
}

/// Rendered values for one alert. Field names serialize to the exact
/// dynamic-template keys the mail template consumes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlertFields {
    pub subject: String,
    pub title: String,
    pub amount: String,
    pub address: String,
    pub time: String,
    pub return_link_text: String,
    pub return_link_url: String,
}

/// One alert, fully rendered and ready to hand to a sink. Built per
/// qualifying transfer and dropped as soon as delivery resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub recipients: Vec<Mailbox>,
    pub template_id: String,
    pub fields: AlertFields,
}

/// What the provider said when it took the message. Opaque to the core;
/// it is only recorded in the cycle report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub status: u16,
    pub body: String,
}

/// Outbound delivery boundary. One call per alert; implementations must
/// not retry internally — the next scheduled cycle is the retry.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, message: &AlertMessage) -> AlertResult<DeliveryReceipt>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_serialize_to_template_keys() {
        let fields = AlertFields {
            subject: "s".into(),
            title: "t".into(),
            amount: "1.5 ETH".into(),
            address: "0xabc - Treasury".into(),
            time: "2024-01-15 11:00:00 AEDT".into(),
            return_link_text: "View transaction".into(),
            return_link_url: "https://etherscan.io/tx/0xdef".into(),
        };

        let value = serde_json::to_value(&fields).expect("fields serialize");
        let object = value.as_object().expect("fields are an object");
        for key in [
            "subject",
            "title",
            "amount",
            "address",
            "time",
            "returnLinkText",
            "returnLinkUrl",
        ] {
            assert!(object.contains_key(key), "missing template key `{key}`");
        }
        assert_eq!(object.len(), 7);
        assert_eq!(value["returnLinkUrl"], "https://etherscan.io/tx/0xdef");
    }

    #[test]
    fn mailbox_omits_missing_display_name() {
        let bare = serde_json::to_value(Mailbox::new("ops@example.com")).unwrap();
        assert_eq!(bare.as_object().unwrap().len(), 1);
        assert_eq!(bare["email"], "ops@example.com");

        let named = serde_json::to_value(Mailbox::named("ops@example.com", "Ops")).unwrap();
        assert_eq!(named["name"], "Ops");
    }
}
