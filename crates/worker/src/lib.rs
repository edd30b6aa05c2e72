//! Notification and enrichment pipelines.
//!
//! - Event queue (best-effort enqueue of status changes)
//! - Digest flush (coalesced status-change emails)
//! - Reminder scan (daily due-date digests)
//! - Enrichment (legal/penalty/impact annotations)
//! - Scheduler (in-process interval ticking)

pub mod digest;
pub mod enrichment;
pub mod queue;
pub mod reminders;
pub mod render;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use digest::{DigestComposer, DigestConfig, FlushReport};
pub use enrichment::{EnrichOptions, EnrichOverrides, EnrichmentOrchestrator};
pub use queue::EventQueue;
pub use reminders::{ReminderConfig, ReminderReport, ReminderScanner};
pub use render::UnsubscribeLinks;
pub use scheduler::*;
