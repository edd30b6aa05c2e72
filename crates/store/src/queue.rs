//! Notification queue persistence.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use digest_core::{Error, NewQueueItem, NotificationKind, NotificationPayload, QueueItem, Result};
use sqlx::types::Json;
use uuid::Uuid;

use crate::client::{lease_secs, store_err, PgStore};
use crate::traits::QueueStore;

/// Raw queue row.
#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    id: Uuid,
    user_id: String,
    email: String,
    company_id: String,
    company_name: String,
    kind: String,
    payload: Json<NotificationPayload>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<QueueRow> for QueueItem {
    type Error = Error;

    fn try_from(row: QueueRow) -> Result<Self> {
        let kind = NotificationKind::parse(&row.kind)
            .ok_or_else(|| Error::internal(format!("unknown notification kind: {}", row.kind)))?;
        Ok(QueueItem {
            id: row.id,
            user_id: row.user_id,
            email: row.email,
            company_id: row.company_id,
            company_name: row.company_name,
            kind,
            payload: row.payload.0,
            created_at: row.created_at,
            processed_at: row.processed_at,
        })
    }
}

#[async_trait]
impl QueueStore for PgStore {
    async fn enqueue(&self, item: NewQueueItem) -> Result<QueueItem> {
        let row = item.into_item(Utc::now());

        sqlx::query(
            "INSERT INTO notification_queue
             (id, user_id, email, company_id, company_name, kind, payload, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(row.id)
        .bind(&row.user_id)
        .bind(&row.email)
        .bind(&row.company_id)
        .bind(&row.company_name)
        .bind(row.kind.as_str())
        .bind(Json(&row.payload))
        .bind(row.created_at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        Ok(row)
    }

    async fn fetch_pending(&self, limit: usize, lease: Duration) -> Result<Vec<QueueItem>> {
        let rows: Vec<QueueRow> = sqlx::query_as(
            "SELECT id, user_id, email, company_id, company_name, kind, payload,
                    created_at, processed_at
             FROM notification_queue
             WHERE processed_at IS NULL
               AND (claimed_at IS NULL OR claimed_at < NOW() - make_interval(secs => $2))
             ORDER BY created_at ASC
             LIMIT $1",
        )
        .bind(limit as i64)
        .bind(lease_secs(lease))
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;

        rows.into_iter().map(QueueItem::try_from).collect()
    }

    async fn claim(&self, ids: &[Uuid], token: Uuid, lease: Duration) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_scalar::<_, Uuid>(
            "UPDATE notification_queue
             SET claimed_at = NOW(), claim_token = $2
             WHERE id = ANY($1)
               AND processed_at IS NULL
               AND (claimed_at IS NULL OR claimed_at < NOW() - make_interval(secs => $3))
             RETURNING id",
        )
        .bind(ids)
        .bind(token)
        .bind(lease_secs(lease))
        .fetch_all(self.pool())
        .await
        .map_err(store_err)
    }

    async fn complete_claim(&self, ids: &[Uuid], token: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notification_queue
             SET processed_at = NOW(), claimed_at = NULL, claim_token = NULL
             WHERE id = ANY($1) AND claim_token = $2 AND processed_at IS NULL",
        )
        .bind(ids)
        .bind(token)
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }

    async fn release_claim(&self, ids: &[Uuid], token: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notification_queue
             SET claimed_at = NULL, claim_token = NULL
             WHERE id = ANY($1) AND claim_token = $2 AND processed_at IS NULL",
        )
        .bind(ids)
        .bind(token)
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }

    async fn mark_suppressed(&self, ids: &[Uuid], lease: Duration) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE notification_queue
             SET processed_at = NOW()
             WHERE id = ANY($1)
               AND processed_at IS NULL
               AND (claimed_at IS NULL OR claimed_at < NOW() - make_interval(secs => $2))",
        )
        .bind(ids)
        .bind(lease_secs(lease))
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }
}
