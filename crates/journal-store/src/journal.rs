use async_trait::async_trait;
use chrono::NaiveDate;
use journal_core::{Setup, Trade};
use serde_json::{json, Value};

use crate::document::DocumentStore;
use crate::error::StoreError;
use crate::models::{JournalState, MentorSession, NotificationRecord, UserProfile};

/// Read side of the journal consumed by the scheduled jobs.
#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserProfile>, StoreError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// The user's journal document, or `None` if they never saved one.
    async fn get_journal(&self, user_id: &str) -> Result<Option<JournalState>, StoreError>;

    async fn get_trades(&self, user_id: &str) -> Result<Vec<Trade>, StoreError> {
        Ok(self
            .get_journal(user_id)
            .await?
            .map(|j| j.trades)
            .unwrap_or_default())
    }

    async fn get_setups(&self, user_id: &str) -> Result<Vec<Setup>, StoreError> {
        Ok(self
            .get_journal(user_id)
            .await?
            .map(|j| j.setups)
            .unwrap_or_default())
    }

    /// Users that have a mentor assigned.
    async fn list_mentees(&self) -> Result<Vec<UserProfile>, StoreError> {
        Ok(self
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.mentor_id.is_some())
            .collect())
    }

    async fn get_confirmed_sessions(&self, user_id: &str)
        -> Result<Vec<MentorSession>, StoreError>;

    /// Last local date a scheduled job completed.
    async fn get_job_marker(&self, job: &str) -> Result<Option<NaiveDate>, StoreError>;

    async fn set_job_marker(&self, job: &str, date: NaiveDate) -> Result<(), StoreError>;
}

/// Destination for in-app notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn record(&self, notification: &NotificationRecord) -> Result<(), StoreError>;
}

/// Journal layout on top of any [`DocumentStore`]:
///
/// ```text
/// users/{uid}                        profile
/// users/{uid}/journalData/state      trades, setups, goals
/// users/{uid}/sessions/{sid}         mentoring sessions
/// users/{uid}/notifications/{nid}    in-app notifications
/// jobs/{name}                        scheduler markers
/// ```
pub struct DocumentJournal<D> {
    docs: D,
}

impl<D: DocumentStore> DocumentJournal<D> {
    pub fn new(docs: D) -> Self {
        Self { docs }
    }

    pub fn documents(&self) -> &D {
        &self.docs
    }

    pub async fn save_user(&self, user: &UserProfile) -> Result<(), StoreError> {
        self.docs
            .set(&format!("users/{}", user.id), &serde_json::to_value(user)?)
            .await
    }

    pub async fn save_journal(&self, user_id: &str, body: &Value) -> Result<(), StoreError> {
        self.docs
            .set(&format!("users/{user_id}/journalData/state"), body)
            .await
    }

    pub async fn save_session(
        &self,
        user_id: &str,
        session_id: &str,
        body: &Value,
    ) -> Result<(), StoreError> {
        self.docs
            .set(&format!("users/{user_id}/sessions/{session_id}"), body)
            .await
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let docs = self
            .docs
            .list(&format!("users/{user_id}/notifications"))
            .await?;
        let mut records = Vec::with_capacity(docs.len());
        for (_, body) in docs {
            let mut record: NotificationRecord = serde_json::from_value(body)?;
            record.user_id = user_id.to_string();
            records.push(record);
        }
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}

#[async_trait]
impl<D: DocumentStore> JournalStore for DocumentJournal<D> {
    async fn list_users(&self) -> Result<Vec<UserProfile>, StoreError> {
        Ok(self
            .docs
            .list("users")
            .await?
            .iter()
            .map(|(id, body)| UserProfile::from_document(id, body))
            .collect())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self
            .docs
            .get(&format!("users/{user_id}"))
            .await?
            .map(|body| UserProfile::from_document(user_id, &body)))
    }

    async fn get_journal(&self, user_id: &str) -> Result<Option<JournalState>, StoreError> {
        Ok(self
            .docs
            .get(&format!("users/{user_id}/journalData/state"))
            .await?
            .map(|body| JournalState::from_document(&body)))
    }

    async fn get_confirmed_sessions(
        &self,
        user_id: &str,
    ) -> Result<Vec<MentorSession>, StoreError> {
        Ok(self
            .docs
            .list(&format!("users/{user_id}/sessions"))
            .await?
            .iter()
            .map(|(id, body)| MentorSession::from_document(id, body))
            .filter(MentorSession::is_confirmed)
            .collect())
    }

    async fn get_job_marker(&self, job: &str) -> Result<Option<NaiveDate>, StoreError> {
        Ok(self
            .docs
            .get(&format!("jobs/{job}"))
            .await?
            .and_then(|body| {
                body.get("lastRun")
                    .and_then(Value::as_str)
                    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            }))
    }

    async fn set_job_marker(&self, job: &str, date: NaiveDate) -> Result<(), StoreError> {
        self.docs
            .set(
                &format!("jobs/{job}"),
                &json!({ "lastRun": date.format("%Y-%m-%d").to_string() }),
            )
            .await
    }
}

#[async_trait]
impl<D: DocumentStore> NotificationSink for DocumentJournal<D> {
    async fn record(&self, notification: &NotificationRecord) -> Result<(), StoreError> {
        self.docs
            .add(
                &format!("users/{}/notifications", notification.user_id),
                &serde_json::to_value(notification)?,
            )
            .await?;
        tracing::debug!(
            "Notification created for {}: {}",
            notification.user_id,
            notification.kind.as_str()
        );
        Ok(())
    }
}
