//! In-memory store for development mode and tests.
//!
//! Mirrors the Postgres claim semantics: a row can be claimed only while
//! unprocessed and not held by a live claim, and completion is guarded by
//! the claim token.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use digest_core::{
    EmailPreference, EnrichmentCacheEntry, Error, InAppNotification, NewQueueItem, QueueItem,
    RecipientUser, RequirementRow, RequirementStatus, Result, Role, StoreErrorCode,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::traits::{EnrichmentCacheStore, PreferenceStore, QueueStore, ReminderStore};

#[derive(Debug, Clone)]
struct StoredItem {
    item: QueueItem,
    claimed_at: Option<DateTime<Utc>>,
    claim_token: Option<Uuid>,
}

impl StoredItem {
    fn claimable(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        self.item.processed_at.is_none()
            && self.claimed_at.map_or(true, |at| at < now - lease)
    }
}

#[derive(Debug, Default)]
struct Inner {
    queue: Vec<StoredItem>,
    preferences: HashMap<String, EmailPreference>,
    requirements: Vec<RequirementRow>,
    users: Vec<RecipientUser>,
    log: HashSet<(String, NaiveDate, String)>,
    in_app: Vec<InAppNotification>,
    cache: HashMap<String, EnrichmentCacheEntry>,
}

/// Store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with a store error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::store(StoreErrorCode::QueryFailed, "store is read-only"));
        }
        Ok(())
    }

    pub fn add_requirement(&self, requirement: RequirementRow) {
        self.inner.lock().requirements.push(requirement);
    }

    pub fn add_user(&self, user: RecipientUser) {
        self.inner.lock().users.push(user);
    }

    pub fn set_preference(&self, preference: EmailPreference) {
        self.inner
            .lock()
            .preferences
            .insert(preference.user_id.clone(), preference);
    }

    pub fn preference(&self, user_id: &str) -> Option<EmailPreference> {
        self.inner.lock().preferences.get(user_id).cloned()
    }

    /// Snapshot of every queue row, processed or not.
    pub fn queue_items(&self) -> Vec<QueueItem> {
        self.inner.lock().queue.iter().map(|s| s.item.clone()).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .queue
            .iter()
            .filter(|s| s.item.processed_at.is_none())
            .count()
    }

    pub fn log_entries(&self) -> Vec<(String, NaiveDate, String)> {
        let mut entries: Vec<_> = self.inner.lock().log.iter().cloned().collect();
        entries.sort();
        entries
    }

    pub fn in_app_notifications(&self) -> Vec<InAppNotification> {
        self.inner.lock().in_app.clone()
    }

    pub fn cache_entries(&self) -> Vec<EnrichmentCacheEntry> {
        self.inner.lock().cache.values().cloned().collect()
    }

    pub fn put_cache_entry(&self, entry: EnrichmentCacheEntry) {
        self.inner.lock().cache.insert(entry.cache_key.clone(), entry);
    }

    /// Backdate an existing claim, simulating a crashed flush.
    pub fn expire_claims(&self, by: Duration) {
        for stored in self.inner.lock().queue.iter_mut() {
            if let Some(at) = stored.claimed_at {
                stored.claimed_at = Some(at - by);
            }
        }
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn enqueue(&self, item: NewQueueItem) -> Result<QueueItem> {
        self.check_writable()?;
        let item = item.into_item(Utc::now());
        self.inner.lock().queue.push(StoredItem {
            item: item.clone(),
            claimed_at: None,
            claim_token: None,
        });
        Ok(item)
    }

    async fn fetch_pending(&self, limit: usize, lease: Duration) -> Result<Vec<QueueItem>> {
        let now = Utc::now();
        let inner = self.inner.lock();
        let mut pending: Vec<QueueItem> = inner
            .queue
            .iter()
            .filter(|s| s.claimable(now, lease))
            .map(|s| s.item.clone())
            .collect();
        pending.sort_by_key(|item| item.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn claim(&self, ids: &[Uuid], token: Uuid, lease: Duration) -> Result<Vec<Uuid>> {
        self.check_writable()?;
        let now = Utc::now();
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        let mut claimed = Vec::new();

        let mut inner = self.inner.lock();
        for stored in inner.queue.iter_mut() {
            if wanted.contains(&stored.item.id) && stored.claimable(now, lease) {
                stored.claimed_at = Some(now);
                stored.claim_token = Some(token);
                claimed.push(stored.item.id);
            }
        }
        Ok(claimed)
    }

    async fn complete_claim(&self, ids: &[Uuid], token: Uuid) -> Result<u64> {
        self.check_writable()?;
        let now = Utc::now();
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        let mut updated = 0;

        let mut inner = self.inner.lock();
        for stored in inner.queue.iter_mut() {
            if wanted.contains(&stored.item.id)
                && stored.claim_token == Some(token)
                && stored.item.processed_at.is_none()
            {
                stored.item.processed_at = Some(now);
                stored.claimed_at = None;
                stored.claim_token = None;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn release_claim(&self, ids: &[Uuid], token: Uuid) -> Result<u64> {
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        let mut released = 0;

        let mut inner = self.inner.lock();
        for stored in inner.queue.iter_mut() {
            if wanted.contains(&stored.item.id)
                && stored.claim_token == Some(token)
                && stored.item.processed_at.is_none()
            {
                stored.claimed_at = None;
                stored.claim_token = None;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn mark_suppressed(&self, ids: &[Uuid], lease: Duration) -> Result<u64> {
        self.check_writable()?;
        let now = Utc::now();
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        let mut updated = 0;

        let mut inner = self.inner.lock();
        for stored in inner.queue.iter_mut() {
            if wanted.contains(&stored.item.id) && stored.claimable(now, lease) {
                stored.item.processed_at = Some(now);
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn load_preferences(&self, user_ids: &[String]) -> Result<HashMap<String, EmailPreference>> {
        let inner = self.inner.lock();
        Ok(user_ids
            .iter()
            .filter_map(|id| inner.preferences.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    async fn upsert_preference(&self, preference: &EmailPreference) -> Result<()> {
        self.check_writable()?;
        self.set_preference(preference.clone());
        Ok(())
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn open_requirements(&self) -> Result<Vec<RequirementRow>> {
        let inner = self.inner.lock();
        let mut open: Vec<RequirementRow> = inner
            .requirements
            .iter()
            .filter(|r| r.status != RequirementStatus::Completed)
            .cloned()
            .collect();
        open.sort_by_key(|r| r.due_date);
        Ok(open)
    }

    async fn reminder_recipients(&self, company_ids: &[String]) -> Result<Vec<RecipientUser>> {
        let inner = self.inner.lock();
        Ok(inner
            .users
            .iter()
            .filter(|u| match (&u.company_id, u.role) {
                (None, Role::Superadmin) => true,
                (Some(company), role) => role.receives_reminders() && company_ids.contains(company),
                (None, _) => false,
            })
            .cloned()
            .collect())
    }

    async fn has_log_entry(&self, user_id: &str, run_date: NaiveDate, kind: &str) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .log
            .contains(&(user_id.to_string(), run_date, kind.to_string())))
    }

    async fn insert_log_entry(&self, user_id: &str, run_date: NaiveDate, kind: &str) -> Result<()> {
        self.check_writable()?;
        self.inner
            .lock()
            .log
            .insert((user_id.to_string(), run_date, kind.to_string()));
        Ok(())
    }

    async fn insert_in_app_notifications(&self, notifications: &[InAppNotification]) -> Result<u64> {
        self.check_writable()?;
        self.inner.lock().in_app.extend_from_slice(notifications);
        Ok(notifications.len() as u64)
    }
}

#[async_trait]
impl EnrichmentCacheStore for MemoryStore {
    async fn get_cached(&self, keys: &[String]) -> Result<HashMap<String, EnrichmentCacheEntry>> {
        let inner = self.inner.lock();
        Ok(keys
            .iter()
            .filter_map(|k| inner.cache.get(k).map(|e| (k.clone(), e.clone())))
            .collect())
    }

    async fn upsert_cached(&self, entries: &[EnrichmentCacheEntry]) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.lock();
        for entry in entries {
            inner.cache.insert(entry.cache_key.clone(), entry.clone());
        }
        Ok(())
    }
}
