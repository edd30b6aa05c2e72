//! Per-user email opt-out preferences.

use serde::{Deserialize, Serialize};

use crate::notification::NotificationKind;
use crate::unsubscribe::UnsubscribeKind;

/// Preferred digest cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestFrequency {
    #[default]
    Instant,
    Daily,
    Weekly,
    None,
}

impl DigestFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instant => "instant",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "instant" => Some(Self::Instant),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Email preferences for one user. A missing row means subscribed to all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPreference {
    pub user_id: String,
    pub unsubscribe_all: bool,
    pub unsubscribe_status_changes: bool,
    pub unsubscribe_reminders: bool,
    pub unsubscribe_team_updates: bool,
    pub digest_frequency: DigestFrequency,
}

impl EmailPreference {
    /// Default (fully subscribed) preferences.
    pub fn subscribed(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            unsubscribe_all: false,
            unsubscribe_status_changes: false,
            unsubscribe_reminders: false,
            unsubscribe_team_updates: false,
            digest_frequency: DigestFrequency::default(),
        }
    }

    /// Whether mail of this kind must not be sent.
    ///
    /// `unsubscribe_all` wins over every kind-specific flag.
    pub fn suppresses(&self, kind: NotificationKind) -> bool {
        if self.unsubscribe_all {
            return true;
        }
        match kind {
            NotificationKind::StatusChange => self.unsubscribe_status_changes,
            NotificationKind::Reminder => self.unsubscribe_reminders,
        }
    }

    /// Apply a one-click unsubscribe.
    pub fn apply_unsubscribe(&mut self, kind: UnsubscribeKind) {
        match kind {
            UnsubscribeKind::All => self.unsubscribe_all = true,
            UnsubscribeKind::StatusChanges => self.unsubscribe_status_changes = true,
            UnsubscribeKind::Reminders => self.unsubscribe_reminders = true,
            UnsubscribeKind::TeamUpdates => self.unsubscribe_team_updates = true,
        }
    }
}
