//! Cron-like triggering for the digest jobs.
//!
//! | job               | cadence (local time)         |
//! |-------------------|------------------------------|
//! | weekly recap      | Fridays from 13:00           |
//! | monthly report    | days 28-31 from 17:00        |
//! | session reminders | every day from 09:00         |
//!
//! A job is due from its start hour until midnight and runs at most once per
//! local date; the last run date is persisted through the store.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use journal_store::JournalStore;

use crate::jobs::{BatchSummary, DigestJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    WeeklyRecap,
    MonthlyReport,
    SessionReminders,
}

impl JobKind {
    /// Key used for the job's run marker.
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::WeeklyRecap => "weekly_recap",
            JobKind::MonthlyReport => "monthly_report",
            JobKind::SessionReminders => "session_reminders",
        }
    }

    /// Accepts the short command-line names as well as marker names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "weekly" | "weekly_recap" => Some(JobKind::WeeklyRecap),
            "monthly" | "monthly_report" => Some(JobKind::MonthlyReport),
            "reminders" | "session_reminders" => Some(JobKind::SessionReminders),
            _ => None,
        }
    }

    pub fn is_due(&self, local: &DateTime<Tz>) -> bool {
        match self {
            JobKind::WeeklyRecap => local.weekday() == Weekday::Fri && local.hour() >= 13,
            JobKind::MonthlyReport => local.day() >= 28 && local.hour() >= 17,
            JobKind::SessionReminders => local.hour() >= 9,
        }
    }
}

pub struct Scheduler {
    store: Arc<dyn JournalStore>,
    timezone: Tz,
    jobs: Vec<Arc<dyn DigestJob>>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn JournalStore>, timezone: Tz) -> Self {
        Self {
            store,
            timezone,
            jobs: Vec::new(),
        }
    }

    pub fn with_job(mut self, job: Arc<dyn DigestJob>) -> Self {
        self.jobs.push(job);
        self
    }

    /// Run every job that is due at `now` and has not yet run today.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<(JobKind, BatchSummary)> {
        let local = now.with_timezone(&self.timezone);
        let today = local.date_naive();
        let mut ran = Vec::new();

        for job in &self.jobs {
            let kind = job.kind();
            if !kind.is_due(&local) {
                continue;
            }

            match self.store.get_job_marker(kind.name()).await {
                Ok(Some(last)) if last >= today => continue,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to read run marker for {}: {}", kind.name(), e);
                    continue;
                }
            }

            match job.run(local).await {
                Ok(summary) => {
                    if let Err(e) = self.store.set_job_marker(kind.name(), today).await {
                        tracing::warn!("Failed to save run marker for {}: {}", kind.name(), e);
                    }
                    ran.push((kind, summary));
                }
                // No marker: the job is retried on the next tick.
                Err(e) => tracing::error!("Job {} failed: {:#}", kind.name(), e),
            }
        }

        ran
    }

    /// Run one job immediately, ignoring its cadence and marker.
    pub async fn run_now(&self, kind: JobKind, now: DateTime<Utc>) -> Result<BatchSummary> {
        let job = self
            .jobs
            .iter()
            .find(|j| j.kind() == kind)
            .ok_or_else(|| anyhow::anyhow!("Job {} is not registered", kind.name()))?;
        job.run(now.with_timezone(&self.timezone)).await
    }
}
