//! Storage seams used by the pipelines.
//!
//! `PgStore` implements these against Postgres; `MemoryStore` implements
//! them in memory for development mode and tests. Both follow the same
//! claim semantics: every transition of a queue row is a single
//! conditional update guarded on `processed_at IS NULL`.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use digest_core::{
    EmailPreference, EnrichmentCacheEntry, InAppNotification, NewQueueItem, QueueItem,
    RecipientUser, RequirementRow, Result,
};
use std::collections::HashMap;
use uuid::Uuid;

/// Notification queue operations.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append one pending row.
    async fn enqueue(&self, item: NewQueueItem) -> Result<QueueItem>;

    /// Oldest-first pending rows that no live claim holds.
    async fn fetch_pending(&self, limit: usize, lease: Duration) -> Result<Vec<QueueItem>>;

    /// Atomically claim pending rows for `token`. Returns the ids actually
    /// claimed; rows already processed or held by a live claim are skipped.
    async fn claim(&self, ids: &[Uuid], token: Uuid, lease: Duration) -> Result<Vec<Uuid>>;

    /// Mark rows claimed by `token` processed. Returns rows updated.
    async fn complete_claim(&self, ids: &[Uuid], token: Uuid) -> Result<u64>;

    /// Drop the claim so the rows are retried on the next run.
    async fn release_claim(&self, ids: &[Uuid], token: Uuid) -> Result<u64>;

    /// Mark unclaimed pending rows processed without sending (opt-out).
    async fn mark_suppressed(&self, ids: &[Uuid], lease: Duration) -> Result<u64>;
}

/// Email preference operations.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Bulk-load preferences for the given users in one round trip.
    async fn load_preferences(&self, user_ids: &[String]) -> Result<HashMap<String, EmailPreference>>;

    async fn upsert_preference(&self, preference: &EmailPreference) -> Result<()>;
}

/// Reads and writes of the reminder scan.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Every requirement whose status is not completed.
    async fn open_requirements(&self) -> Result<Vec<RequirementRow>>;

    /// Admins/superadmins of the given companies plus platform superadmins.
    async fn reminder_recipients(&self, company_ids: &[String]) -> Result<Vec<RecipientUser>>;

    async fn has_log_entry(&self, user_id: &str, run_date: NaiveDate, kind: &str) -> Result<bool>;

    /// Record a confirmed send. Duplicate inserts are ignored.
    async fn insert_log_entry(&self, user_id: &str, run_date: NaiveDate, kind: &str) -> Result<()>;

    async fn insert_in_app_notifications(&self, notifications: &[InAppNotification]) -> Result<u64>;
}

/// Persistent enrichment cache.
#[async_trait]
pub trait EnrichmentCacheStore: Send + Sync {
    async fn get_cached(&self, keys: &[String]) -> Result<HashMap<String, EnrichmentCacheEntry>>;

    /// Last write wins.
    async fn upsert_cached(&self, entries: &[EnrichmentCacheEntry]) -> Result<()>;
}

/// Everything the pipelines need from persistence.
pub trait Store: QueueStore + PreferenceStore + ReminderStore + EnrichmentCacheStore {}

impl<T> Store for T where T: QueueStore + PreferenceStore + ReminderStore + EnrichmentCacheStore {}
