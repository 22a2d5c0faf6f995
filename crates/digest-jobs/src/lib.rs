//! Scheduled digest jobs for the trading journal: weekly recaps, monthly
//! reports and session reminders.

pub mod config;
pub mod jobs;
pub mod schedule;

pub use config::JobsConfig;
pub use jobs::{
    BatchSummary, DigestJob, JobContext, MonthlyReportJob, SessionReminderJob, WeeklyRecapJob,
};
pub use schedule::{JobKind, Scheduler};
