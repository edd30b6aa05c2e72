//! Queued notification events.
//!
//! A `QueueItem` is one status change (or queued reminder) for one
//! recipient. Items sharing (recipient, kind) are coalesced into a single
//! digest by the flush job; they are the unit of grouping, not delivery.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::requirement::RequirementStatus;
use crate::unsubscribe::UnsubscribeKind;

/// Notification kind carried by a queue row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    StatusChange,
    Reminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusChange => "status_change",
            Self::Reminder => "reminder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "status_change" => Some(Self::StatusChange),
            "reminder" => Some(Self::Reminder),
            _ => None,
        }
    }

    /// The opt-out a digest of this kind links to.
    pub fn unsubscribe_kind(&self) -> UnsubscribeKind {
        match self {
            Self::StatusChange => UnsubscribeKind::StatusChanges,
            Self::Reminder => UnsubscribeKind::Reminders,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload stored with each queue row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub requirement_id: String,
    pub requirement_name: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub old_status: Option<RequirementStatus>,
    #[serde(default)]
    pub new_status: Option<RequirementStatus>,
    #[serde(default)]
    pub recipient_name: Option<String>,
}

/// A pending (or processed) notification row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub user_id: String,
    pub email: String,
    pub company_id: String,
    pub company_name: String,
    pub kind: NotificationKind,
    pub payload: NotificationPayload,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    pub fn is_pending(&self) -> bool {
        self.processed_at.is_none()
    }

    /// Grouping key for digest composition.
    pub fn group_key(&self) -> (String, NotificationKind) {
        (self.user_id.clone(), self.kind)
    }
}

/// A queue row to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQueueItem {
    pub user_id: String,
    pub email: String,
    pub company_id: String,
    pub company_name: String,
    pub kind: NotificationKind,
    pub payload: NotificationPayload,
}

impl NewQueueItem {
    /// Materialize into a row with a fresh id.
    pub fn into_item(self, now: DateTime<Utc>) -> QueueItem {
        QueueItem {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            email: self.email,
            company_id: self.company_id,
            company_name: self.company_name,
            kind: self.kind,
            payload: self.payload,
            created_at: now,
            processed_at: None,
        }
    }
}

/// Status-change event emitted by request-handling code.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeEvent {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 200))]
    pub recipient_name: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub company_id: String,
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    #[validate(length(min = 1, max = 128))]
    pub requirement_id: String,
    #[validate(length(min = 1, max = 500))]
    pub requirement_name: String,
    pub due_date: Option<NaiveDate>,
    pub old_status: RequirementStatus,
    pub new_status: RequirementStatus,
}

impl From<StatusChangeEvent> for NewQueueItem {
    fn from(event: StatusChangeEvent) -> Self {
        Self {
            user_id: event.user_id,
            email: event.email,
            company_id: event.company_id,
            company_name: event.company_name,
            kind: NotificationKind::StatusChange,
            payload: NotificationPayload {
                requirement_id: event.requirement_id,
                requirement_name: event.requirement_name,
                due_date: event.due_date,
                old_status: Some(event.old_status),
                new_status: Some(event.new_status),
                recipient_name: event.recipient_name,
            },
        }
    }
}

/// In-app notification row written alongside reminder emails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InAppNotification {
    pub user_id: String,
    pub company_id: String,
    pub requirement_id: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
