//! Digest flush: coalesce pending queue items into one email per
//! (recipient, kind) group.
//!
//! Every queue transition is a single conditional update in the store, so
//! overlapping flushes never send the same row twice: rows are claimed
//! before rendering and only rows this run claimed are completed.

use chrono::Duration;
use digest_core::limits::{DEFAULT_CLAIM_LEASE_SECS, DEFAULT_FLUSH_BATCH_SIZE, DEFAULT_SECTION_LIMIT};
use digest_core::{Error, NotificationKind, QueueItem, Result};
use mailer::EmailSender;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use store::Store;
use telemetry::metrics;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::render::{render_status_digest, UnsubscribeLinks};

/// Flush tuning.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub batch_size: usize,
    pub section_limit: usize,
    pub claim_lease: Duration,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_FLUSH_BATCH_SIZE,
            section_limit: DEFAULT_SECTION_LIMIT,
            claim_lease: Duration::seconds(DEFAULT_CLAIM_LEASE_SECS),
        }
    }
}

/// Outcome of one flush run. `sent`, `suppressed` and `failed` count
/// groups; `items_processed` counts rows marked processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReport {
    pub fetched: usize,
    pub groups: usize,
    pub sent: usize,
    pub suppressed: usize,
    pub failed: usize,
    pub items_processed: u64,
}

/// Group key to items, ordered by recipient then kind.
pub fn group_items(items: Vec<QueueItem>) -> BTreeMap<(String, NotificationKind), Vec<QueueItem>> {
    let mut groups: BTreeMap<(String, NotificationKind), Vec<QueueItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.group_key()).or_default().push(item);
    }
    groups
}

pub struct DigestComposer {
    store: Arc<dyn Store>,
    mailer: Option<Arc<dyn EmailSender>>,
    links: UnsubscribeLinks,
    config: DigestConfig,
}

impl DigestComposer {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Option<Arc<dyn EmailSender>>,
        links: UnsubscribeLinks,
        config: DigestConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            links,
            config,
        }
    }

    /// Run one flush over up to `batch_size` pending items.
    ///
    /// Returns `Err` only when the batch cannot be read at all; per-group
    /// failures are counted in the report and retried next run.
    pub async fn flush(&self) -> Result<FlushReport> {
        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| Error::unavailable("email delivery is not configured"))?;

        let started = Instant::now();
        metrics().flush_runs.inc();
        let lease = self.config.claim_lease;

        let items = self.store.fetch_pending(self.config.batch_size, lease).await?;
        let mut report = FlushReport {
            fetched: items.len(),
            ..Default::default()
        };
        if items.is_empty() {
            debug!("No pending notifications");
            return Ok(report);
        }

        let groups = group_items(items);
        report.groups = groups.len();

        let mut user_ids: Vec<String> = groups.keys().map(|(user, _)| user.clone()).collect();
        user_ids.dedup();
        let preferences = self.store.load_preferences(&user_ids).await?;

        for ((user_id, kind), items) in &groups {
            let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();

            if preferences.get(user_id).is_some_and(|p| p.suppresses(*kind)) {
                match self.store.mark_suppressed(&ids, lease).await {
                    Ok(n) => {
                        report.suppressed += 1;
                        report.items_processed += n;
                        metrics().items_suppressed.inc_by(n);
                        metrics().items_processed.inc_by(n);
                        debug!(user_id = %user_id, kind = %kind, items = n, "Recipient opted out, items skipped");
                    }
                    Err(e) => {
                        report.failed += 1;
                        warn!(user_id = %user_id, kind = %kind, error = %e, "Failed to mark opted-out items");
                    }
                }
                continue;
            }

            let token = Uuid::new_v4();
            let claimed = match self.store.claim(&ids, token, lease).await {
                Ok(claimed) => claimed,
                Err(e) => {
                    report.failed += 1;
                    warn!(user_id = %user_id, kind = %kind, error = %e, "Failed to claim group");
                    continue;
                }
            };
            if claimed.is_empty() {
                debug!(user_id = %user_id, kind = %kind, "Group already claimed by another run");
                continue;
            }

            let claimed_set: HashSet<Uuid> = claimed.iter().copied().collect();
            let claimed_items: Vec<&QueueItem> =
                items.iter().filter(|i| claimed_set.contains(&i.id)).collect();

            let Some(email) = render_status_digest(&claimed_items, self.config.section_limit, &self.links)
            else {
                continue;
            };

            match mailer.send(&email).await {
                Ok(_) => {
                    report.sent += 1;
                    metrics().digests_sent.inc();
                    match self.store.complete_claim(&claimed, token).await {
                        Ok(n) => {
                            report.items_processed += n;
                            metrics().items_processed.inc_by(n);
                        }
                        // the lease expires and the group is sent again
                        Err(e) => error!(
                            user_id = %user_id,
                            kind = %kind,
                            error = %e,
                            "Digest sent but items could not be marked processed"
                        ),
                    }
                    info!(user_id = %user_id, kind = %kind, items = claimed.len(), "Digest sent");
                }
                Err(e) => {
                    report.failed += 1;
                    metrics().digest_send_failures.inc();
                    warn!(user_id = %user_id, kind = %kind, error = %e, "Digest send failed, will retry");
                    if let Err(e) = self.store.release_claim(&claimed, token).await {
                        warn!(user_id = %user_id, error = %e, "Failed to release claim; it will expire");
                    }
                }
            }
        }

        metrics()
            .flush_latency_ms
            .observe(started.elapsed().as_millis() as u64);
        info!(
            fetched = report.fetched,
            groups = report.groups,
            sent = report.sent,
            suppressed = report.suppressed,
            failed = report.failed,
            items_processed = report.items_processed,
            "Digest flush complete"
        );

        Ok(report)
    }
}
