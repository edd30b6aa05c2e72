//! Requirement, recipient and idempotency-log queries for the reminder scan.

use async_trait::async_trait;
use chrono::NaiveDate;
use digest_core::{
    Error, InAppNotification, RecipientUser, RequirementRow, RequirementStatus, Result, Role,
};
use sqlx::QueryBuilder;
use tracing::warn;
use uuid::Uuid;

use crate::client::{store_err, PgStore};
use crate::traits::ReminderStore;

#[derive(Debug, sqlx::FromRow)]
struct RequirementDbRow {
    id: String,
    company_id: String,
    company_name: String,
    requirement: String,
    due_date: NaiveDate,
    status: String,
}

#[derive(Debug, sqlx::FromRow)]
struct RecipientDbRow {
    id: String,
    email: String,
    name: Option<String>,
    role: String,
    company_id: Option<String>,
}

impl TryFrom<RecipientDbRow> for RecipientUser {
    type Error = Error;

    fn try_from(row: RecipientDbRow) -> Result<Self> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| Error::internal(format!("unknown role: {}", row.role)))?;
        Ok(Self {
            user_id: row.id,
            email: row.email,
            name: row.name,
            role,
            company_id: row.company_id,
        })
    }
}

#[async_trait]
impl ReminderStore for PgStore {
    async fn open_requirements(&self) -> Result<Vec<RequirementRow>> {
        let rows: Vec<RequirementDbRow> = sqlx::query_as(
            "SELECT r.id, r.company_id, c.name AS company_name, r.requirement, r.due_date, r.status
             FROM compliance_requirements r
             JOIN companies c ON c.id = r.company_id
             WHERE r.status <> 'completed'
             ORDER BY r.due_date ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;

        let mut requirements = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(status) = RequirementStatus::parse(&row.status) else {
                warn!(requirement_id = %row.id, status = %row.status, "Skipping requirement with unknown status");
                continue;
            };
            requirements.push(RequirementRow {
                id: row.id,
                company_id: row.company_id,
                company_name: row.company_name,
                requirement: row.requirement,
                due_date: row.due_date,
                status,
            });
        }
        Ok(requirements)
    }

    async fn reminder_recipients(&self, company_ids: &[String]) -> Result<Vec<RecipientUser>> {
        let rows: Vec<RecipientDbRow> = sqlx::query_as(
            "SELECT id, email, name, role, company_id
             FROM users
             WHERE (role IN ('admin', 'superadmin') AND company_id = ANY($1))
                OR (role = 'superadmin' AND company_id IS NULL)",
        )
        .bind(company_ids)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;

        rows.into_iter().map(RecipientUser::try_from).collect()
    }

    async fn has_log_entry(&self, user_id: &str, run_date: NaiveDate, kind: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM notification_log
                WHERE user_id = $1 AND run_date = $2 AND kind = $3
             )",
        )
        .bind(user_id)
        .bind(run_date)
        .bind(kind)
        .fetch_one(self.pool())
        .await
        .map_err(store_err)
    }

    async fn insert_log_entry(&self, user_id: &str, run_date: NaiveDate, kind: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO notification_log (user_id, run_date, kind, sent_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (user_id, run_date, kind) DO NOTHING",
        )
        .bind(user_id)
        .bind(run_date)
        .bind(kind)
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn insert_in_app_notifications(&self, notifications: &[InAppNotification]) -> Result<u64> {
        if notifications.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::new(
            "INSERT INTO in_app_notifications
             (id, user_id, company_id, requirement_id, title, message, created_at) ",
        );
        builder.push_values(notifications, |mut row, n| {
            row.push_bind(Uuid::new_v4())
                .push_bind(&n.user_id)
                .push_bind(&n.company_id)
                .push_bind(&n.requirement_id)
                .push_bind(&n.title)
                .push_bind(&n.message)
                .push_bind(n.created_at);
        });

        let result = builder
            .build()
            .execute(self.pool())
            .await
            .map_err(store_err)?;

        Ok(result.rows_affected())
    }
}
