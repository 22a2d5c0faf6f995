use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use journal_core::{reduce_period, ReportWindow};
use journal_store::{NotificationKind, NotificationRecord};
use notification_service::{EmailMessage, EmailTemplate};

use super::{digest_line, BatchSummary, DigestJob, JobContext};
use crate::schedule::JobKind;

/// Friday recap of the current Monday-to-today window.
pub struct WeeklyRecapJob {
    ctx: Arc<JobContext>,
}

impl WeeklyRecapJob {
    pub fn new(ctx: Arc<JobContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl DigestJob for WeeklyRecapJob {
    fn kind(&self) -> JobKind {
        JobKind::WeeklyRecap
    }

    async fn run(&self, now: DateTime<Tz>) -> Result<BatchSummary> {
        let window = ReportWindow::weekly(now.date_naive());
        tracing::info!("Starting weekly recap emails for {}", window.label());

        let users = self
            .ctx
            .store
            .list_users()
            .await
            .context("Failed to list users")?;

        let mut summary = BatchSummary::default();
        for user in users {
            summary.processed += 1;
            let Some((email, name)) = user.contact() else {
                summary.skipped += 1;
                continue;
            };

            let journal = match self.ctx.store.get_journal(&user.id).await {
                Ok(Some(journal)) => journal,
                Ok(None) => {
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Failed to load journal for {}: {}", user.id, e);
                    summary.failed += 1;
                    continue;
                }
            };

            let trades = window.select(&journal.trades);
            if trades.is_empty() {
                summary.skipped += 1;
                continue;
            }
            let stats = match reduce_period(trades, &journal.setups, None) {
                Ok(stats) => stats.display(self.ctx.win_rate_precision),
                Err(e) => {
                    tracing::warn!("Failed to build weekly recap for {}: {}", user.id, e);
                    summary.failed += 1;
                    continue;
                }
            };

            let message = EmailMessage::new(
                email,
                format!("Weekly Recap: {}", window.label()),
                EmailTemplate::weekly_recap(name, &stats, &window, &self.ctx.app_url),
            );
            let record = NotificationRecord::new(
                &user.id,
                NotificationKind::WeeklyRecap,
                "Weekly Recap Ready",
                digest_line(&stats),
                Some("checkins"),
            );

            if self.ctx.deliver(&message, &[record]).await {
                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
        }

        tracing::info!("Weekly recap finished: {}", summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{context, seed_user, FakeTransport, TestJournal};
    use chrono::TimeZone;
    use journal_store::MemoryDocumentStore;
    use serde_json::json;

    fn friday_afternoon() -> DateTime<Tz> {
        chrono_tz::America::New_York
            .with_ymd_and_hms(2024, 6, 7, 13, 0, 0)
            .unwrap()
    }

    fn week_state() -> serde_json::Value {
        json!({
            "trades": [
                {"entryDate": "2024-06-03", "entryPrice": 100, "exitPrice": 110, "shares": 10, "positionType": "long", "setupId": "s1"},
                {"entryDate": "2024-06-04", "entryPrice": 50, "exitPrice": 40, "shares": 5, "positionType": "long"},
                {"entryDate": "2024-05-31", "entryPrice": 10, "exitPrice": 20, "shares": 100}
            ],
            "setups": [{"id": "s1", "name": "Opening Range"}]
        })
    }

    #[tokio::test]
    async fn test_weekly_recap_sends_and_records() {
        let journal = Arc::new(TestJournal::new(MemoryDocumentStore::new()));
        let transport = Arc::new(FakeTransport::default());
        seed_user(&journal, "u1", Some("ana@example.com"), Some("Ana"), Some(week_state()))
            .await
            .unwrap();

        let job = WeeklyRecapJob::new(context(&journal, &transport));
        let summary = job.run(friday_afternoon()).await.unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                processed: 1,
                sent: 1,
                skipped: 0,
                failed: 0
            }
        );

        let sent = transport.sent.lock().await;
        assert_eq!(sent[0].subject, "Weekly Recap: 2024-06-03 - 2024-06-07");
        assert!(sent[0].html.contains("50.0%"));
        assert!(sent[0].html.contains("Opening Range"));

        let notes = journal.list_notifications("u1").await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::WeeklyRecap);
        assert_eq!(notes[0].title, "Weekly Recap Ready");
        assert_eq!(notes[0].message, "2 trades, +$50");
        assert_eq!(notes[0].link.as_deref(), Some("checkins"));
        assert!(!notes[0].read);
    }

    #[tokio::test]
    async fn test_skips_incomplete_and_idle_users() {
        let journal = Arc::new(TestJournal::new(MemoryDocumentStore::new()));
        let transport = Arc::new(FakeTransport::default());
        seed_user(&journal, "no-name", Some("x@example.com"), None, Some(week_state()))
            .await
            .unwrap();
        seed_user(&journal, "no-journal", Some("y@example.com"), Some("Yan"), None)
            .await
            .unwrap();
        seed_user(
            &journal,
            "idle",
            Some("z@example.com"),
            Some("Zoe"),
            Some(json!({"trades": [{"entryDate": "2024-05-01", "entryPrice": 1, "shares": 1}]})),
        )
        .await
        .unwrap();

        let job = WeeklyRecapJob::new(context(&journal, &transport));
        let summary = job.run(friday_afternoon()).await.unwrap();
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.sent, 0);
        assert!(transport.sent.lock().await.is_empty());
        assert!(journal.list_notifications("idle").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_send_does_not_stop_batch() {
        let journal = Arc::new(TestJournal::new(MemoryDocumentStore::new()));
        let transport = Arc::new(FakeTransport::failing_for(&["ana@example.com"]));
        seed_user(&journal, "u1", Some("ana@example.com"), Some("Ana"), Some(week_state()))
            .await
            .unwrap();
        seed_user(&journal, "u2", Some("ben@example.com"), Some("Ben"), Some(week_state()))
            .await
            .unwrap();

        let job = WeeklyRecapJob::new(context(&journal, &transport));
        let summary = job.run(friday_afternoon()).await.unwrap();
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.failed, 1);

        let sent = transport.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ben@example.com");
        // The notification write runs alongside the send and is kept.
        assert_eq!(journal.list_notifications("u1").await.unwrap().len(), 1);
    }
}
