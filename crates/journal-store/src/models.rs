use chrono::{DateTime, Utc};
use journal_core::{date_from_value, decimal_from_value, Setup, Trade};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Account document at `users/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mentor_id: Option<String>,
    #[serde(default)]
    pub mentor_name: Option<String>,
}

impl UserProfile {
    pub fn from_document(id: &str, body: &Value) -> Self {
        Self {
            id: id.to_string(),
            email: non_empty_str(body.get("email")),
            display_name: non_empty_str(body.get("displayName")),
            mentor_id: non_empty_str(body.get("mentorId")),
            mentor_name: non_empty_str(body.get("mentorName")),
        }
    }

    /// Email and display name, when both are present. Digest jobs skip users
    /// without them.
    pub fn contact(&self) -> Option<(&str, &str)> {
        Some((self.email.as_deref()?, self.display_name.as_deref()?))
    }
}

/// The journal document at `users/{id}/journalData/state`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JournalState {
    pub trades: Vec<Trade>,
    pub setups: Vec<Setup>,
    pub yearly_goal: Option<Decimal>,
}

impl JournalState {
    /// Entries that are not objects are dropped; everything else decodes
    /// leniently.
    pub fn from_document(body: &Value) -> Self {
        let trades = body
            .get("trades")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|v| v.is_object())
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let setups = body
            .get("setups")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| serde_json::from_value::<Setup>(v.clone()).ok())
                    .filter(|s| !s.id.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let yearly_goal = body
            .pointer("/goals/yearly")
            .or_else(|| body.get("yearlyGoal"))
            .and_then(decimal_from_value);

        Self {
            trades,
            setups,
            yearly_goal,
        }
    }
}

/// A mentoring session document at `users/{mentee}/sessions/{id}`.
#[derive(Debug, Clone, PartialEq)]
pub struct MentorSession {
    pub id: String,
    pub date_time: Option<DateTime<Utc>>,
    pub status: String,
    pub topic: String,
    pub video_link: Option<String>,
    pub scheduled_by_id: Option<String>,
}

impl MentorSession {
    pub fn from_document(id: &str, body: &Value) -> Self {
        Self {
            id: id.to_string(),
            date_time: body.get("dateTime").and_then(instant_from_value),
            status: non_empty_str(body.get("status")).unwrap_or_default(),
            topic: non_empty_str(body.get("topic")).unwrap_or_default(),
            video_link: non_empty_str(body.get("videoLink")),
            scheduled_by_id: non_empty_str(body.get("scheduledById")),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == "confirmed"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    WeeklyRecap,
    MonthlyReport,
    SessionReminder,
    DailyTarget,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::WeeklyRecap => "weekly_recap",
            NotificationKind::MonthlyReport => "monthly_report",
            NotificationKind::SessionReminder => "session_reminder",
            NotificationKind::DailyTarget => "daily_target",
        }
    }
}

/// In-app notification written to `users/{id}/notifications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[serde(skip)]
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn new(
        user_id: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        link: Option<&str>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            title: title.into(),
            message: message.into(),
            link: link.map(str::to_string),
            read: false,
            created_at: Utc::now(),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn instant_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Object(map) => {
            let secs = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0);
            DateTime::from_timestamp(secs, nanos)
        }
        // A bare date has no time of day; treat it as midnight UTC.
        other => date_from_value(other)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc()),
    }
}
