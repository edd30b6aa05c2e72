//! Best-effort notification enqueue.
//!
//! Called from request handling after a status change is committed. A
//! failed write is logged and counted, never surfaced to the caller: the
//! status change itself must not be rolled back because mail is late.

use digest_core::{NewQueueItem, QueueItem, StatusChangeEvent};
use std::sync::Arc;
use store::Store;
use telemetry::metrics;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct EventQueue {
    store: Arc<dyn Store>,
}

impl EventQueue {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append one pending item. Returns `None` when the write failed.
    pub async fn enqueue(&self, item: NewQueueItem) -> Option<QueueItem> {
        let user_id = item.user_id.clone();
        let kind = item.kind;

        match self.store.enqueue(item).await {
            Ok(queued) => {
                metrics().items_enqueued.inc();
                debug!(user_id = %user_id, kind = %kind, id = %queued.id, "Notification enqueued");
                Some(queued)
            }
            Err(e) => {
                metrics().enqueue_failures.inc();
                warn!(user_id = %user_id, kind = %kind, error = %e, "Failed to enqueue notification");
                None
            }
        }
    }

    pub async fn enqueue_status_change(&self, event: StatusChangeEvent) -> Option<QueueItem> {
        self.enqueue(NewQueueItem::from(event)).await
    }
}
