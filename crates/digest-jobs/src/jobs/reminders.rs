use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use journal_store::{NotificationKind, NotificationRecord};
use notification_service::{EmailMessage, EmailTemplate};

use super::{BatchSummary, DigestJob, JobContext};
use crate::schedule::JobKind;

/// Reminds mentees (and their mentors) of confirmed sessions happening
/// tomorrow in the local timezone.
pub struct SessionReminderJob {
    ctx: Arc<JobContext>,
}

impl SessionReminderJob {
    pub fn new(ctx: Arc<JobContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl DigestJob for SessionReminderJob {
    fn kind(&self) -> JobKind {
        JobKind::SessionReminders
    }

    async fn run(&self, now: DateTime<Tz>) -> Result<BatchSummary> {
        let tz = now.timezone();
        let Some(tomorrow) = now.date_naive().succ_opt() else {
            return Ok(BatchSummary::default());
        };
        tracing::info!("Checking for sessions on {}", tomorrow);

        let mentees = self
            .ctx
            .store
            .list_mentees()
            .await
            .context("Failed to list mentees")?;

        let mut summary = BatchSummary::default();
        for mentee in mentees {
            let sessions = match self.ctx.store.get_confirmed_sessions(&mentee.id).await {
                Ok(sessions) => sessions,
                Err(e) => {
                    tracing::warn!("Failed to load sessions for {}: {}", mentee.id, e);
                    summary.failed += 1;
                    continue;
                }
            };

            let mentor_name = mentee.mentor_name.as_deref().unwrap_or("your mentor");
            let mentee_name = mentee.display_name.as_deref().unwrap_or("your mentee");

            for session in sessions {
                let Some(start) = session.date_time.map(|dt| dt.with_timezone(&tz)) else {
                    continue;
                };
                if start.date_naive() != tomorrow {
                    continue;
                }
                summary.processed += 1;

                let when = start.format("%A, %B %-d at %-I:%M %p").to_string();
                let mut records = vec![NotificationRecord::new(
                    &mentee.id,
                    NotificationKind::SessionReminder,
                    "Session Tomorrow!",
                    format!("{} with {}: {}", when, mentor_name, session.topic),
                    Some("sessions"),
                )];
                if let Some(mentor_id) = &session.scheduled_by_id {
                    records.push(NotificationRecord::new(
                        mentor_id,
                        NotificationKind::SessionReminder,
                        "Session Tomorrow!",
                        format!("{} with {}: {}", when, mentee_name, session.topic),
                        Some("mentees"),
                    ));
                }

                let Some(email) = mentee.email.as_deref() else {
                    self.ctx.record_all(&records).await;
                    summary.skipped += 1;
                    continue;
                };

                let message = EmailMessage::new(
                    email,
                    format!("Session Tomorrow with {}", mentor_name),
                    EmailTemplate::session_reminder(
                        mentee.display_name.as_deref().unwrap_or("there"),
                        mentor_name,
                        &when,
                        &session.topic,
                        session.video_link.as_deref(),
                    ),
                );
                if self.ctx.deliver(&message, &records).await {
                    summary.sent += 1;
                } else {
                    summary.failed += 1;
                }
            }
        }

        tracing::info!("Session reminder check finished: {}", summary);
        Ok(summary)
    }
}
