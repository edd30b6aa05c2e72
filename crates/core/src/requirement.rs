//! Compliance requirements as seen by the pipelines (read-only snapshot).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Requirement lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    NotStarted,
    Pending,
    Completed,
    Overdue,
    Upcoming,
}

impl RequirementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
            Self::Upcoming => "upcoming",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "overdue" => Some(Self::Overdue),
            "upcoming" => Some(Self::Upcoming),
            _ => None,
        }
    }

    /// Human label used in email bodies.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Overdue => "Overdue",
            Self::Upcoming => "Upcoming",
        }
    }
}

/// A compliance requirement row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementRow {
    pub id: String,
    pub company_id: String,
    pub company_name: String,
    pub requirement: String,
    pub due_date: NaiveDate,
    pub status: RequirementStatus,
}

impl RequirementRow {
    /// Whole calendar days from `today` until the due date (negative when overdue).
    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.due_date - today).num_days()
    }
}
