//! Persistence for the compliance notifier.
//!
//! Postgres in production, an in-memory store in development mode and
//! tests. Pipelines only see the traits in [`traits`].

pub mod cache;
pub mod client;
pub mod config;
pub mod health;
pub mod memory;
pub mod preferences;
pub mod queue;
pub mod reminders;
pub mod traits;

pub use client::PgStore;
pub use config::StoreConfig;
pub use health::check_connection;
pub use memory::MemoryStore;
pub use traits::{EnrichmentCacheStore, PreferenceStore, QueueStore, ReminderStore, Store};
