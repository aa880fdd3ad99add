//! SendGrid implementation of the domain's [`AlertSink`] boundary: one
//! dynamic-template transmission per alert via the v3 `mail/send`
//! endpoint. No retries here; the next scheduled cycle is the retry.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use treasury_watch_domain::alerts::{
    AlertError, AlertFields, AlertMessage, AlertResult, AlertSink, DeliveryReceipt, Mailbox,
};

/// Templated mailer over the SendGrid v3 API.
pub struct SendGridMailer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    sender: Mailbox,
}

impl SendGridMailer {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        sender: Mailbox,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            sender,
        }
    }
}

#[async_trait]
impl AlertSink for SendGridMailer {
    async fn deliver(&self, message: &AlertMessage) -> AlertResult<DeliveryReceipt> {
        let body = MailSendBody::build(&self.sender, message);

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(AlertError::from_transport)?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            debug!(status = status.as_u16(), "sendgrid accepted alert");
            Ok(DeliveryReceipt {
                status: status.as_u16(),
                body: text,
            })
        } else {
            Err(AlertError::Rejected {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

/// The v3 `mail/send` request body. Content comes entirely from the
/// dynamic template; only addressing and field data are sent.
#[derive(Debug, Serialize)]
struct MailSendBody<'a> {
    from: &'a Mailbox,
    template_id: &'a str,
    personalizations: [Personalization<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: &'a [Mailbox],
    dynamic_template_data: &'a AlertFields,
}

impl<'a> MailSendBody<'a> {
    fn build(sender: &'a Mailbox, message: &'a AlertMessage) -> Self {
        Self {
            from: sender,
            template_id: &message.template_id,
            personalizations: [Personalization {
                to: &message.recipients,
                dynamic_template_data: &message.fields,
            }],
        }
    }
}
