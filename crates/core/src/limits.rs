//! Batch sizes, display caps and scheduling thresholds.
//!
//! These are the defaults; most can be overridden through configuration.

// === Digest flush ===

/// Maximum queue rows read per flush invocation.
pub const DEFAULT_FLUSH_BATCH_SIZE: usize = 500;

/// Rows rendered inline per digest section before the "+N more" suffix.
pub const DEFAULT_SECTION_LIMIT: usize = 15;

/// How long a claim on queue rows stays valid (seconds).
///
/// A runner that crashes mid-send leaves its claim behind; once the lease
/// expires the rows become visible to the next flush.
pub const DEFAULT_CLAIM_LEASE_SECS: i64 = 600;

// === Reminders ===

/// Days-until-due values that trigger a "due soon" reminder.
pub const REMINDER_THRESHOLDS: [i64; 4] = [14, 7, 3, 1];

/// Overdue items are reminded daily up to this many days, then weekly.
pub const OVERDUE_DAILY_WINDOW: i64 = 7;

/// Idempotency log kind for the daily reminder digest.
pub const REMINDER_LOG_KIND: &str = "reminder_digest";

/// Log kind recording in-app reminders for users who opted out of email.
pub const REMINDER_IN_APP_LOG_KIND: &str = "reminder_in_app";

// === Enrichment ===

/// Days a cached enrichment result stays fresh.
pub const DEFAULT_CACHE_TTL_DAYS: i64 = 60;

/// Longest cache TTL a caller may ask for.
pub const MAX_CACHE_TTL_DAYS: i64 = 3650;

/// Concurrent search calls in flight.
pub const DEFAULT_ENRICHMENT_CONCURRENCY: usize = 3;

/// Search calls allowed per enrich() invocation.
pub const DEFAULT_MAX_SEARCHES: usize = 25;

/// Items folded into a single LLM call.
pub const DEFAULT_LLM_BATCH_SIZE: usize = 10;

/// Maximum requirements accepted per enrichment request.
pub const MAX_ENRICHMENT_ITEMS: usize = 200;

/// Text used for any annotation field we could not compute.
pub const FALLBACK_TEXT: &str = "Information not available";

// === Registry ===

/// Company Identification Number pattern.
pub const CIN_PATTERN: &str = r"^[LU][0-9]{5}[A-Z]{2}[0-9]{4}[A-Z]{3}[0-9]{6}$";

/// Director Identification Number pattern.
pub const DIN_PATTERN: &str = r"^[0-9]{8}$";
