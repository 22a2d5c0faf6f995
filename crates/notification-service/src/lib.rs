mod format;
mod resend;
mod smtp;
mod templates;
mod transactional;
mod verification;

pub use format::{escape_html, group_digits, signed_currency};
pub use resend::ResendTransport;
pub use smtp::SmtpTransport;
pub use templates::EmailTemplate;
pub use transactional::{
    DailyTargetRequest, InviteAcceptedRequest, MentorInviteRequest, RegistrationRequest,
    TransactionalMailer,
};
pub use verification::{VerificationCodes, VerifyOutcome};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A rendered email ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
        }
    }

    /// All three fields are required.
    pub fn validate(&self) -> Result<(), NotificationError> {
        if self.to.trim().is_empty() || self.subject.trim().is_empty() || self.html.trim().is_empty()
        {
            return Err(NotificationError::InvalidArgument(
                "Missing required fields: to, subject, html".into(),
            ));
        }
        Ok(())
    }
}

/// What the provider returned for an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    pub id: Option<String>,
}

/// Trait for outbound email providers.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, NotificationError>;
    fn name(&self) -> &str;
}

/// Errors from the notification system.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Email API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransportKind {
    #[default]
    Resend,
    Smtp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SmtpTls {
    #[default]
    StartTls,
    Tls,
    None,
}

/// Configuration for outbound email. Secrets only ever come from the
/// environment.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub transport: TransportKind,
    pub from: Option<String>,
    pub resend_api_key: Option<String>,
    pub resend_api_url: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_tls: SmtpTls,
    /// Link target for buttons in emails.
    pub app_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Resend,
            from: None,
            resend_api_key: None,
            resend_api_url: "https://api.resend.com".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_tls: SmtpTls::StartTls,
            app_url: "https://ohyaaa.com".to_string(),
        }
    }
}

impl NotificationConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| get(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let defaults = Self::default();

        let transport = match var("EMAIL_TRANSPORT").as_deref() {
            Some("smtp") => TransportKind::Smtp,
            _ => TransportKind::Resend,
        };

        let smtp_tls = match var("SMTP_TLS").as_deref() {
            Some("tls") => SmtpTls::Tls,
            Some("none") => SmtpTls::None,
            _ => SmtpTls::StartTls,
        };

        Self {
            transport,
            from: var("EMAIL_FROM"),
            resend_api_key: var("RESEND_API_KEY"),
            resend_api_url: var("RESEND_API_URL").unwrap_or(defaults.resend_api_url),
            smtp_host: var("SMTP_HOST"),
            smtp_port: var("SMTP_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.smtp_port),
            smtp_username: var("SMTP_USERNAME"),
            smtp_password: var("SMTP_PASSWORD"),
            smtp_tls,
            app_url: var("APP_URL").unwrap_or(defaults.app_url),
        }
    }

    /// Build the configured transport.
    pub fn build_transport(&self) -> Result<Arc<dyn EmailTransport>, NotificationError> {
        let transport: Arc<dyn EmailTransport> = match self.transport {
            TransportKind::Resend => Arc::new(ResendTransport::new(self)?),
            TransportKind::Smtp => Arc::new(SmtpTransport::new(self)?),
        };
        tracing::info!("Email transport: {}", transport.name());
        Ok(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = NotificationConfig::from_lookup(lookup(&[]));
        assert_eq!(config.transport, TransportKind::Resend);
        assert_eq!(config.resend_api_url, "https://api.resend.com");
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.smtp_tls, SmtpTls::StartTls);
        assert!(config.resend_api_key.is_none());
    }

    #[test]
    fn test_config_from_values() {
        let config = NotificationConfig::from_lookup(lookup(&[
            ("EMAIL_TRANSPORT", "smtp"),
            ("SMTP_HOST", "mail.example.com"),
            ("SMTP_PORT", "2525"),
            ("SMTP_TLS", "none"),
            ("EMAIL_FROM", "Journal <noreply@example.com>"),
            ("APP_URL", "https://journal.example.com"),
            ("RESEND_API_KEY", "  "),
        ]));
        assert_eq!(config.transport, TransportKind::Smtp);
        assert_eq!(config.smtp_host.as_deref(), Some("mail.example.com"));
        assert_eq!(config.smtp_port, 2525);
        assert_eq!(config.smtp_tls, SmtpTls::None);
        assert_eq!(config.app_url, "https://journal.example.com");
        assert!(config.resend_api_key.is_none());
    }

    #[test]
    fn test_resend_transport_requires_key() {
        let config = NotificationConfig {
            from: Some("noreply@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.build_transport(),
            Err(NotificationError::Config(_))
        ));
    }

    #[test]
    fn test_message_validation() {
        assert!(EmailMessage::new("a@b.c", "Hi", "<p>x</p>").validate().is_ok());
        assert!(matches!(
            EmailMessage::new("", "Hi", "<p>x</p>").validate(),
            Err(NotificationError::InvalidArgument(_))
        ));
        assert!(EmailMessage::new("a@b.c", " ", "<p>x</p>").validate().is_err());
    }
}
