use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::types::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Weekly,
    Monthly,
    YearToDate,
}

/// An inclusive calendar range ending on "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    pub kind: WindowKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportWindow {
    /// Monday of the current week through `today`.
    pub fn weekly(today: NaiveDate) -> Self {
        let offset = today.weekday().number_from_monday() - 1;
        Self {
            kind: WindowKind::Weekly,
            start: today - Duration::days(i64::from(offset)),
            end: today,
        }
    }

    /// First of the current month through `today`.
    pub fn monthly(today: NaiveDate) -> Self {
        Self {
            kind: WindowKind::Monthly,
            start: today.with_day(1).unwrap_or(today),
            end: today,
        }
    }

    /// January 1 of the current year through `today`.
    pub fn year_to_date(today: NaiveDate) -> Self {
        Self {
            kind: WindowKind::YearToDate,
            start: NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
            end: today,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Trades dated inside the window. Undated trades are never selected.
    pub fn select<'a>(&self, trades: &'a [Trade]) -> Vec<&'a Trade> {
        trades
            .iter()
            .filter(|t| t.entry_date.is_some_and(|d| self.contains(d)))
            .collect()
    }

    /// `2024-06-03 - 2024-06-07`
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// True only on the final calendar day of the month, whatever its length.
pub fn is_last_day_of_month(today: NaiveDate) -> bool {
    today.succ_opt().map_or(true, |tomorrow| tomorrow.day() == 1)
}
