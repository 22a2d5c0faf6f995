mod monthly;
mod reminders;
mod weekly;

pub use monthly::MonthlyReportJob;
pub use reminders::SessionReminderJob;
pub use weekly::WeeklyRecapJob;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use journal_core::StatsDisplay;
use journal_store::{JournalStore, NotificationRecord, NotificationSink};
use notification_service::{signed_currency, EmailMessage, EmailTransport};

use crate::schedule::JobKind;

/// Collaborators shared by every job.
pub struct JobContext {
    pub store: Arc<dyn JournalStore>,
    pub sink: Arc<dyn NotificationSink>,
    pub transport: Arc<dyn EmailTransport>,
    pub app_url: String,
    pub win_rate_precision: u32,
}

impl JobContext {
    /// Send the email and write the notifications concurrently. Notification
    /// failures are logged only; the return value reflects the email.
    pub(crate) async fn deliver(
        &self,
        message: &EmailMessage,
        records: &[NotificationRecord],
    ) -> bool {
        let (sent, ()) = tokio::join!(self.transport.send(message), self.record_all(records));
        match sent {
            Ok(receipt) => {
                tracing::info!(
                    "Sent \"{}\" to {} (id: {:?})",
                    message.subject,
                    message.to,
                    receipt.id
                );
                true
            }
            Err(e) => {
                tracing::warn!("Failed to send \"{}\" to {}: {}", message.subject, message.to, e);
                false
            }
        }
    }

    pub(crate) async fn record_all(&self, records: &[NotificationRecord]) {
        for record in records {
            if let Err(e) = self.sink.record(record).await {
                tracing::warn!(
                    "Failed to record {} notification for {}: {}",
                    record.kind.as_str(),
                    record.user_id,
                    e
                );
            }
        }
    }
}

/// Per-run counts. `processed` is every candidate considered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} processed, {} sent, {} skipped, {} failed",
            self.processed, self.sent, self.skipped, self.failed
        )
    }
}

/// A batch job the scheduler can trigger.
#[async_trait]
pub trait DigestJob: Send + Sync {
    fn kind(&self) -> JobKind;

    /// Run once for the given local time. Errors abort the whole run; per-user
    /// problems are counted in the summary instead.
    async fn run(&self, now: DateTime<Tz>) -> Result<BatchSummary>;
}

/// `12 trades, +$1,234`
pub(crate) fn digest_line(stats: &StatsDisplay) -> String {
    format!(
        "{} trades, {}",
        stats.total_trades,
        signed_currency(stats.total_pnl)
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use journal_store::{DocumentJournal, MemoryDocumentStore, StoreError, UserProfile};
    use notification_service::{NotificationError, SendReceipt};
    use serde_json::Value;
    use tokio::sync::Mutex;

    /// Records messages; fails for any recipient listed in `fail_for`.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        pub(crate) sent: Mutex<Vec<EmailMessage>>,
        pub(crate) fail_for: Vec<String>,
    }

    impl FakeTransport {
        pub(crate) fn failing_for(recipients: &[&str]) -> Self {
            Self {
                sent: Mutex::default(),
                fail_for: recipients.iter().map(|r| r.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl EmailTransport for FakeTransport {
        async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, NotificationError> {
            if self.fail_for.contains(&message.to) {
                return Err(NotificationError::Api {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.sent.lock().await.push(message.clone());
            Ok(SendReceipt::default())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    pub(crate) type TestJournal = DocumentJournal<MemoryDocumentStore>;

    pub(crate) fn context(
        journal: &Arc<TestJournal>,
        transport: &Arc<FakeTransport>,
    ) -> Arc<JobContext> {
        Arc::new(JobContext {
            store: journal.clone(),
            sink: journal.clone(),
            transport: transport.clone(),
            app_url: "https://ohyaaa.com".to_string(),
            win_rate_precision: 1,
        })
    }

    pub(crate) async fn seed_user(
        journal: &TestJournal,
        id: &str,
        email: Option<&str>,
        name: Option<&str>,
        state: Option<Value>,
    ) -> Result<(), StoreError> {
        journal
            .save_user(&UserProfile {
                id: id.to_string(),
                email: email.map(str::to_string),
                display_name: name.map(str::to_string),
                ..Default::default()
            })
            .await?;
        if let Some(state) = state {
            journal.save_journal(id, &state).await?;
        }
        Ok(())
    }
}
