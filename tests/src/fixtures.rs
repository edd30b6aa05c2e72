//! Test fixtures.

use chrono::{Duration, NaiveDate};
use digest_core::{
    NewQueueItem, NotificationKind, NotificationPayload, RecipientUser, RequirementInput,
    RequirementRow, RequirementStatus, Role, StatusChangeEvent,
};

/// Fixed scan date so reminder arithmetic is deterministic.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

pub fn days_from_today(days: i64) -> NaiveDate {
    today() + Duration::days(days)
}

pub fn email_for(user_id: &str) -> String {
    format!("{}@example.com", user_id)
}

/// Status change queue row for `user_id` at company `company_id`.
pub fn status_change(
    user_id: &str,
    company_id: &str,
    requirement_id: &str,
    old_status: RequirementStatus,
    new_status: RequirementStatus,
) -> NewQueueItem {
    NewQueueItem {
        user_id: user_id.to_string(),
        email: email_for(user_id),
        company_id: company_id.to_string(),
        company_name: company_name(company_id),
        kind: NotificationKind::StatusChange,
        payload: NotificationPayload {
            requirement_id: requirement_id.to_string(),
            requirement_name: format!("Requirement {}", requirement_id.to_uppercase()),
            due_date: Some(days_from_today(5)),
            old_status: Some(old_status),
            new_status: Some(new_status),
            recipient_name: None,
        },
    }
}

/// JSON body accepted by `POST /notifications/status-change`.
pub fn status_change_event(user_id: &str, requirement_id: &str) -> StatusChangeEvent {
    StatusChangeEvent {
        user_id: user_id.to_string(),
        email: email_for(user_id),
        recipient_name: Some("Priya".to_string()),
        company_id: "co-1".to_string(),
        company_name: company_name("co-1"),
        requirement_id: requirement_id.to_string(),
        requirement_name: "GST annual return".to_string(),
        due_date: Some(days_from_today(3)),
        old_status: RequirementStatus::Pending,
        new_status: RequirementStatus::Completed,
    }
}

pub fn company_name(company_id: &str) -> String {
    format!("{} Pvt Ltd", company_id.to_uppercase())
}

pub fn requirement(id: &str, company_id: &str, days_until_due: i64) -> RequirementRow {
    RequirementRow {
        id: id.to_string(),
        company_id: company_id.to_string(),
        company_name: company_name(company_id),
        requirement: format!("Requirement {}", id),
        due_date: days_from_today(days_until_due),
        status: RequirementStatus::Pending,
    }
}

pub fn admin(user_id: &str, company_id: &str) -> RecipientUser {
    RecipientUser {
        user_id: user_id.to_string(),
        email: email_for(user_id),
        name: Some(format!("Admin {}", user_id)),
        role: Role::Admin,
        company_id: Some(company_id.to_string()),
    }
}

pub fn member(user_id: &str, company_id: &str) -> RecipientUser {
    RecipientUser {
        role: Role::User,
        ..admin(user_id, company_id)
    }
}

pub fn platform_superadmin(user_id: &str) -> RecipientUser {
    RecipientUser {
        user_id: user_id.to_string(),
        email: email_for(user_id),
        name: None,
        role: Role::Superadmin,
        company_id: None,
    }
}

pub fn requirement_input(id: &str, text: &str) -> RequirementInput {
    RequirementInput {
        id: id.to_string(),
        category: "ROC filings".to_string(),
        requirement: text.to_string(),
    }
}
