//! Daily reminder scan.
//!
//! Finds open requirements at the reminder thresholds (or overdue within
//! the repeat window), resolves company admins plus platform superadmins,
//! and sends each user one digest per day. A log row keyed on
//! (user, date, kind) is written only after a confirmed send, so a failed
//! send is retried on the next run the same day. In-app notifications
//! follow a confirmed send; users who opted out of reminder email still
//! get them, once per day under their own log kind.

use chrono::{NaiveDate, Utc};
use digest_core::limits::{
    DEFAULT_SECTION_LIMIT, OVERDUE_DAILY_WINDOW, REMINDER_IN_APP_LOG_KIND, REMINDER_LOG_KIND,
    REMINDER_THRESHOLDS,
};
use digest_core::{
    Error, InAppNotification, NotificationKind, RecipientUser, RequirementRow, Result,
};
use mailer::EmailSender;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use store::Store;
use telemetry::metrics;
use tracing::{debug, error, info, warn};

use crate::render::{render_reminder_digest, UnsubscribeLinks};

/// Why a requirement is in today's reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReminderBucket {
    /// Days past the due date.
    Overdue(i64),
    /// Days until the due date; one of the reminder thresholds.
    DueIn(i64),
}

impl ReminderBucket {
    pub fn is_overdue(&self) -> bool {
        matches!(self, Self::Overdue(_))
    }

    pub fn label(&self) -> String {
        match self {
            Self::Overdue(1) => "overdue by 1 day".to_string(),
            Self::Overdue(days) => format!("overdue by {} days", days),
            Self::DueIn(1) => "due in 1 day".to_string(),
            Self::DueIn(days) => format!("due in {} days", days),
        }
    }
}

/// Classify a requirement by whole days until its due date.
///
/// Overdue items repeat daily for the first week, then weekly.
pub fn classify(days_until_due: i64) -> Option<ReminderBucket> {
    if days_until_due < 0 {
        let days_overdue = -days_until_due;
        if days_overdue <= OVERDUE_DAILY_WINDOW || days_overdue % 7 == 0 {
            return Some(ReminderBucket::Overdue(days_overdue));
        }
        return None;
    }
    REMINDER_THRESHOLDS
        .contains(&days_until_due)
        .then_some(ReminderBucket::DueIn(days_until_due))
}

/// A user and the qualifying requirements across their companies.
#[derive(Debug, Clone)]
pub struct RecipientDigest<'a> {
    pub user: RecipientUser,
    pub requirements: Vec<(&'a RequirementRow, ReminderBucket)>,
}

/// Map qualifying requirements onto recipients.
///
/// Company-scoped admins see their own company; platform superadmins see
/// every company. Output is ordered by user id.
pub fn resolve_recipients<'a>(
    qualifying: &[(&'a RequirementRow, ReminderBucket)],
    users: &[RecipientUser],
) -> Vec<RecipientDigest<'a>> {
    let mut digests: BTreeMap<&str, RecipientDigest<'a>> = BTreeMap::new();

    for user in users {
        let visible: Vec<(&RequirementRow, ReminderBucket)> = if user.is_platform_superadmin() {
            qualifying.to_vec()
        } else if user.role.receives_reminders() {
            qualifying
                .iter()
                .filter(|(row, _)| user.company_id.as_deref() == Some(row.company_id.as_str()))
                .copied()
                .collect()
        } else {
            Vec::new()
        };
        if visible.is_empty() {
            continue;
        }

        let digest = digests
            .entry(user.user_id.as_str())
            .or_insert_with(|| RecipientDigest {
                user: user.clone(),
                requirements: Vec::new(),
            });
        for entry in visible {
            if !digest.requirements.iter().any(|(row, _)| row.id == entry.0.id) {
                digest.requirements.push(entry);
            }
        }
    }

    digests.into_values().collect()
}

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub section_limit: usize,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            section_limit: DEFAULT_SECTION_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderReport {
    pub qualifying_requirements: usize,
    pub recipients: usize,
    pub sent: usize,
    pub skipped_already_sent: usize,
    pub opted_out: usize,
    pub failed: usize,
}

pub struct ReminderScanner {
    store: Arc<dyn Store>,
    mailer: Option<Arc<dyn EmailSender>>,
    links: UnsubscribeLinks,
    config: ReminderConfig,
}

impl ReminderScanner {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Option<Arc<dyn EmailSender>>,
        links: UnsubscribeLinks,
        config: ReminderConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            links,
            config,
        }
    }

    /// Scan for today's UTC calendar date.
    pub async fn run_today(&self) -> Result<ReminderReport> {
        self.run(Utc::now().date_naive()).await
    }

    pub async fn run(&self, today: NaiveDate) -> Result<ReminderReport> {
        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| Error::unavailable("email delivery is not configured"))?;

        let started = Instant::now();
        metrics().reminder_runs.inc();
        let mut report = ReminderReport::default();

        let open = self.store.open_requirements().await?;
        let qualifying: Vec<(&RequirementRow, ReminderBucket)> = open
            .iter()
            .filter_map(|row| classify(row.days_until_due(today)).map(|bucket| (row, bucket)))
            .collect();
        report.qualifying_requirements = qualifying.len();
        if qualifying.is_empty() {
            info!(today = %today, "No requirements need reminders");
            return Ok(report);
        }

        let company_ids: Vec<String> = qualifying
            .iter()
            .map(|(row, _)| row.company_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let users = self.store.reminder_recipients(&company_ids).await?;
        let digests = resolve_recipients(&qualifying, &users);
        report.recipients = digests.len();

        let user_ids: Vec<String> = digests.iter().map(|d| d.user.user_id.clone()).collect();
        let preferences = self.store.load_preferences(&user_ids).await?;

        for digest in &digests {
            let user = &digest.user;

            if preferences
                .get(&user.user_id)
                .is_some_and(|p| p.suppresses(NotificationKind::Reminder))
            {
                report.opted_out += 1;
                debug!(user_id = %user.user_id, "Recipient opted out of reminder email");
                self.write_in_app_only(user, &digest.requirements, today).await;
                continue;
            }

            match self.store.has_log_entry(&user.user_id, today, REMINDER_LOG_KIND).await {
                Ok(true) => {
                    report.skipped_already_sent += 1;
                    metrics().reminders_skipped.inc();
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(user_id = %user.user_id, error = %e, "Failed to read reminder log");
                    continue;
                }
            }

            let email = render_reminder_digest(
                &user.email,
                user.name.as_deref(),
                &user.user_id,
                &digest.requirements,
                today,
                self.config.section_limit,
                &self.links,
            );

            if let Err(e) = mailer.send(&email).await {
                report.failed += 1;
                metrics().reminder_failures.inc();
                warn!(user_id = %user.user_id, error = %e, "Reminder send failed, will retry");
                continue;
            }

            report.sent += 1;
            metrics().reminders_sent.inc();

            if let Err(e) = self
                .store
                .insert_log_entry(&user.user_id, today, REMINDER_LOG_KIND)
                .await
            {
                error!(user_id = %user.user_id, error = %e, "Reminder sent but log entry not written");
            }

            let in_app = in_app_notifications(user, &digest.requirements);
            if let Err(e) = self.store.insert_in_app_notifications(&in_app).await {
                warn!(user_id = %user.user_id, error = %e, "Failed to write in-app notifications");
            }

            info!(
                user_id = %user.user_id,
                requirements = digest.requirements.len(),
                "Reminder digest sent"
            );
        }

        metrics()
            .reminder_latency_ms
            .observe(started.elapsed().as_millis() as u64);
        info!(
            today = %today,
            qualifying = report.qualifying_requirements,
            recipients = report.recipients,
            sent = report.sent,
            skipped = report.skipped_already_sent,
            opted_out = report.opted_out,
            failed = report.failed,
            "Reminder scan complete"
        );

        Ok(report)
    }
}

impl ReminderScanner {
    /// In-app rows for a user who receives no reminder email.
    async fn write_in_app_only(
        &self,
        user: &RecipientUser,
        requirements: &[(&RequirementRow, ReminderBucket)],
        today: NaiveDate,
    ) {
        match self
            .store
            .has_log_entry(&user.user_id, today, REMINDER_IN_APP_LOG_KIND)
            .await
        {
            Ok(false) => {}
            Ok(true) => return,
            Err(e) => {
                warn!(user_id = %user.user_id, error = %e, "Failed to read in-app reminder log");
                return;
            }
        }

        let in_app = in_app_notifications(user, requirements);
        if let Err(e) = self.store.insert_in_app_notifications(&in_app).await {
            warn!(user_id = %user.user_id, error = %e, "Failed to write in-app notifications");
            return;
        }
        if let Err(e) = self
            .store
            .insert_log_entry(&user.user_id, today, REMINDER_IN_APP_LOG_KIND)
            .await
        {
            warn!(user_id = %user.user_id, error = %e, "In-app reminders written but log entry not");
        }
    }
}

fn in_app_notifications(
    user: &RecipientUser,
    requirements: &[(&RequirementRow, ReminderBucket)],
) -> Vec<InAppNotification> {
    let now = Utc::now();
    requirements
        .iter()
        .map(|(row, bucket)| {
            let title = if bucket.is_overdue() {
                "Compliance requirement overdue"
            } else {
                "Compliance deadline approaching"
            };
            InAppNotification {
                user_id: user.user_id.clone(),
                company_id: row.company_id.clone(),
                requirement_id: row.id.clone(),
                title: title.to_string(),
                message: format!(
                    "{} for {} is {} (due {}).",
                    row.requirement,
                    row.company_name,
                    bucket.label(),
                    row.due_date.format("%d %b %Y")
                ),
                created_at: now,
            }
        })
        .collect()
}
