use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{EmailMessage, EmailTransport, NotificationConfig, NotificationError, SendReceipt};

/// Resend HTTP email API (`POST /emails`).
pub struct ResendTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl ResendTransport {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let api_key = config
            .resend_api_key
            .clone()
            .ok_or_else(|| NotificationError::Config("RESEND_API_KEY not set".into()))?;
        let from = config
            .from
            .clone()
            .ok_or_else(|| NotificationError::Config("EMAIL_FROM not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/emails", config.resend_api_url.trim_end_matches('/')),
            api_key,
            from,
        })
    }

    fn payload(&self, message: &EmailMessage) -> Value {
        json!({
            "from": self.from,
            "to": [message.to],
            "subject": message.subject,
            "html": message.html,
        })
    }
}

#[async_trait]
impl EmailTransport for ResendTransport {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, NotificationError> {
        message.validate()?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.payload(message))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!("Resend API error {} for {}: {}", status, message.to, body);
            return Err(NotificationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let id = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("id").and_then(Value::as_str).map(str::to_string));
        tracing::debug!("Email sent to {} (id: {:?})", message.to, id);

        Ok(SendReceipt { id })
    }

    fn name(&self) -> &str {
        "resend"
    }
}
