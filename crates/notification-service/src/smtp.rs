use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{authentication::Credentials, response::Response},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    EmailMessage, EmailTransport, NotificationConfig, NotificationError, SendReceipt, SmtpTls,
};

pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpTransport {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| NotificationError::Config("SMTP_HOST not set".into()))?;
        let from_addr = config
            .from
            .as_deref()
            .ok_or_else(|| NotificationError::Config("EMAIL_FROM not set".into()))?;

        let from: Mailbox = from_addr
            .parse()
            .map_err(|e| NotificationError::Config(format!("Invalid from address: {}", e)))?;

        let mut builder = match config.smtp_tls {
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
            SmtpTls::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                host,
            )),
        }
        .map_err(|e| NotificationError::Smtp(format!("SMTP transport error: {}", e)))?;

        builder = builder.port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailTransport for SmtpTransport {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, NotificationError> {
        message.validate()?;

        let recipient: Mailbox = message.to.parse().map_err(|e| {
            NotificationError::InvalidArgument(format!("Invalid recipient {}: {}", message.to, e))
        })?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(&message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
            .map_err(|e| NotificationError::Smtp(format!("Failed to build email: {}", e)))?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| NotificationError::Smtp(format!("Failed to send email: {}", e)))?;

        Ok(receipt(&response))
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

/// The first line of the server's reply usually carries the queue id.
fn receipt(response: &Response) -> SendReceipt {
    let id = response.message().next().map(str::to_string);
    SendReceipt { id }
}
