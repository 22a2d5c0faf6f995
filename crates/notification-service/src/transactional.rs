use std::sync::Arc;

use journal_core::whole_units;
use journal_store::{NotificationKind, NotificationRecord, NotificationSink};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::format::{group_digits, signed_currency};
use crate::templates::EmailTemplate;
use crate::{EmailMessage, EmailTransport, NotificationError, SendReceipt};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorInviteRequest {
    pub mentor_name: Option<String>,
    pub mentee_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteAcceptedRequest {
    pub mentor_email: Option<String>,
    pub mentee_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTargetRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub profit: Option<Decimal>,
    pub target: Option<Decimal>,
    /// When set, an in-app notification is recorded alongside the email.
    pub user_id: Option<String>,
}

/// One-off emails triggered by user actions.
pub struct TransactionalMailer {
    transport: Arc<dyn EmailTransport>,
    sink: Option<Arc<dyn NotificationSink>>,
    app_url: String,
}

impl TransactionalMailer {
    pub fn new(transport: Arc<dyn EmailTransport>, app_url: impl Into<String>) -> Self {
        Self {
            transport,
            sink: None,
            app_url: app_url.into(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub async fn send_registration(
        &self,
        req: &RegistrationRequest,
    ) -> Result<SendReceipt, NotificationError> {
        let (email, name) = match (present(&req.email), present(&req.name)) {
            (Some(e), Some(n)) => (e, n),
            _ => return Err(invalid("Email and name required")),
        };
        self.deliver(EmailMessage::new(
            email,
            "Welcome to ohYaaa!",
            EmailTemplate::registration(name, &self.app_url),
        ))
        .await
    }

    pub async fn send_mentor_invite(
        &self,
        req: &MentorInviteRequest,
    ) -> Result<SendReceipt, NotificationError> {
        let (mentor, mentee_email) = match (present(&req.mentor_name), present(&req.mentee_email))
        {
            (Some(m), Some(e)) => (m, e),
            _ => return Err(invalid("Missing params")),
        };
        self.deliver(EmailMessage::new(
            mentee_email,
            format!("{mentor} invited you to ohYaaa"),
            EmailTemplate::mentor_invite(mentor, mentee_email, &self.app_url),
        ))
        .await
    }

    pub async fn send_invite_accepted(
        &self,
        req: &InviteAcceptedRequest,
    ) -> Result<SendReceipt, NotificationError> {
        let (mentor_email, mentee) = match (present(&req.mentor_email), present(&req.mentee_name))
        {
            (Some(e), Some(m)) => (e, m),
            _ => return Err(invalid("Missing params")),
        };
        self.deliver(EmailMessage::new(
            mentor_email,
            format!("{mentee} accepted your invitation!"),
            EmailTemplate::invite_accepted(mentee, &self.app_url),
        ))
        .await
    }

    /// A zero profit is valid; a missing or zero target is not.
    pub async fn send_daily_target(
        &self,
        req: &DailyTargetRequest,
    ) -> Result<SendReceipt, NotificationError> {
        let target = req.target.filter(|t| !t.is_zero());
        let (email, name, profit, target) =
            match (present(&req.email), present(&req.name), req.profit, target) {
                (Some(e), Some(n), Some(p), Some(t)) => (e, n, p, t),
                _ => return Err(invalid("Missing params")),
            };

        let profit = whole_units(profit);
        let target = whole_units(target);
        let receipt = self
            .deliver(EmailMessage::new(
                email,
                "Daily Target Achieved!",
                EmailTemplate::daily_target(name, profit, target),
            ))
            .await?;

        if let (Some(sink), Some(user_id)) = (&self.sink, present(&req.user_id)) {
            let message = format!(
                "{} (target ${})",
                signed_currency(profit),
                group_digits(target.unsigned_abs())
            );
            let record = NotificationRecord::new(
                user_id,
                NotificationKind::DailyTarget,
                "Daily Target Achieved!",
                message,
                Some("dashboard"),
            );
            if let Err(e) = sink.record(&record).await {
                tracing::warn!("Failed to record daily target notification for {}: {}", user_id, e);
            }
        }

        Ok(receipt)
    }

    async fn deliver(&self, message: EmailMessage) -> Result<SendReceipt, NotificationError> {
        match self.transport.send(&message).await {
            Ok(receipt) => {
                tracing::info!("Email sent to {}: {}", message.to, message.subject);
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!("Failed to send email to {}: {}", message.to, e);
                Err(e)
            }
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn invalid(msg: &str) -> NotificationError {
    NotificationError::InvalidArgument(msg.to_string())
}
