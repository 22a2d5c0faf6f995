use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use journal_core::{is_last_day_of_month, reduce_period, total_pnl, GoalContext, ReportWindow};
use journal_store::{NotificationKind, NotificationRecord};
use notification_service::{EmailMessage, EmailTemplate};

use super::{digest_line, BatchSummary, DigestJob, JobContext};
use crate::schedule::JobKind;

/// Month-to-date report, sent on the last calendar day of the month.
pub struct MonthlyReportJob {
    ctx: Arc<JobContext>,
}

impl MonthlyReportJob {
    pub fn new(ctx: Arc<JobContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl DigestJob for MonthlyReportJob {
    fn kind(&self) -> JobKind {
        JobKind::MonthlyReport
    }

    async fn run(&self, now: DateTime<Tz>) -> Result<BatchSummary> {
        let today = now.date_naive();
        if !is_last_day_of_month(today) {
            tracing::info!("{} is not the last day of the month, no reports sent", today);
            return Ok(BatchSummary::default());
        }

        let window = ReportWindow::monthly(today);
        let year_to_date = ReportWindow::year_to_date(today);
        let month_name = today.format("%B").to_string();
        tracing::info!("Starting {} monthly reports", month_name);

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

            let stats = journal
                .yearly_goal
                .map(|target| {
                    total_pnl(year_to_date.select(&journal.trades))
                        .map(|ytd| GoalContext::new(ytd, target))
                })
                .transpose()
                .and_then(|goal| reduce_period(trades, &journal.setups, goal.as_ref()));
            let stats = match stats {
                Ok(stats) => stats.display(self.ctx.win_rate_precision),
                Err(e) => {
                    tracing::warn!("Failed to build monthly report for {}: {}", user.id, e);
                    summary.failed += 1;
                    continue;
                }
            };

            let message = EmailMessage::new(
                email,
                format!("{} {} Report", month_name, today.year()),
                EmailTemplate::monthly_report(
                    name,
                    &stats,
                    &month_name,
                    today.year(),
                    &self.ctx.app_url,
                ),
            );
            let record = NotificationRecord::new(
                &user.id,
                NotificationKind::MonthlyReport,
                format!("{} Report Ready", month_name),
                digest_line(&stats),
                Some("dashboard"),
            );

            if self.ctx.deliver(&message, &[record]).await {
                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
        }

        tracing::info!("Monthly report finished: {}", summary);
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

    fn at(y: i32, m: u32, d: u32) -> DateTime<Tz> {
        chrono_tz::America::New_York
            .with_ymd_and_hms(y, m, d, 17, 0, 0)
            .unwrap()
    }

    fn state() -> serde_json::Value {
        json!({
            "trades": [
                {"entryDate": "2024-01-15", "entryPrice": 10, "exitPrice": 30, "shares": 100},
                {"entryDate": "2024-06-03", "entryPrice": 100, "exitPrice": 110, "shares": 10},
                {"entryDate": "2024-06-04", "entryPrice": 50, "exitPrice": 40, "shares": 5},
                {"entryDate": "2024-06-04", "entryPrice": 20, "exitPrice": 25, "shares": 10, "positionType": "short"}
            ],
            "goals": {"yearly": 10000}
        })
    }

    #[tokio::test]
    async fn test_not_last_day_is_noop() {
        let journal = Arc::new(TestJournal::new(MemoryDocumentStore::new()));
        let transport = Arc::new(FakeTransport::default());
        seed_user(&journal, "u1", Some("ana@example.com"), Some("Ana"), Some(state()))
            .await
            .unwrap();

        let job = MonthlyReportJob::new(context(&journal, &transport));
        let summary = job.run(at(2024, 6, 28)).await.unwrap();
        assert_eq!(summary, BatchSummary::default());
        assert!(transport.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_last_day_report_with_goal() {
        let journal = Arc::new(TestJournal::new(MemoryDocumentStore::new()));
        let transport = Arc::new(FakeTransport::default());
        seed_user(&journal, "u1", Some("ana@example.com"), Some("Ana"), Some(state()))
            .await
            .unwrap();

        let job = MonthlyReportJob::new(context(&journal, &transport));
        let summary = job.run(at(2024, 6, 30)).await.unwrap();
        assert_eq!(summary.sent, 1);

        // June: +100, -50, -50 (short) = 0 over 2 days.
        // Year to date: 2000 + 0 = 2000 of 10000 => 20%.
        let sent = transport.sent.lock().await;
        assert_eq!(sent[0].subject, "June 2024 Report");
        assert!(sent[0].html.contains("20%"));
        assert!(sent[0].html.contains("33.3%"));

        let notes = journal.list_notifications("u1").await.unwrap();
        assert_eq!(notes[0].kind, NotificationKind::MonthlyReport);
        assert_eq!(notes[0].title, "June Report Ready");
        assert_eq!(notes[0].message, "3 trades, +$0");
        assert_eq!(notes[0].link.as_deref(), Some("dashboard"));
    }

    #[tokio::test]
    async fn test_leap_year_february() {
        let journal = Arc::new(TestJournal::new(MemoryDocumentStore::new()));
        let transport = Arc::new(FakeTransport::default());
        seed_user(
            &journal,
            "u1",
            Some("ana@example.com"),
            Some("Ana"),
            Some(json!({"trades": [{"entryDate": "2024-02-29", "entryPrice": 10, "exitPrice": 11, "shares": 10}]})),
        )
        .await
        .unwrap();

        let job = MonthlyReportJob::new(context(&journal, &transport));
        assert_eq!(job.run(at(2024, 2, 28)).await.unwrap().sent, 0);
        assert_eq!(job.run(at(2024, 2, 29)).await.unwrap().sent, 1);
        assert_eq!(
            transport.sent.lock().await[0].subject,
            "February 2024 Report"
        );
    }
}
