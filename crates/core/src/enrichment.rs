//! Enrichment inputs, annotations and cache entries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::limits::{FALLBACK_TEXT, MAX_CACHE_TTL_DAYS};

/// A requirement to annotate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequirementInput {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub category: String,
    #[validate(length(min = 1, max = 2000))]
    pub requirement: String,
}

impl RequirementInput {
    /// Content-derived cache key: sha-256 of category and normalized text.
    pub fn cache_key(&self) -> String {
        cache_key(&self.category, &self.requirement)
    }
}

/// Lowercase, trim, and collapse internal whitespace.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cache key for a (category, requirement text) pair.
pub fn cache_key(category: &str, requirement: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(category).as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_text(requirement).as_bytes());
    hex::encode(hasher.finalize())
}

/// Three-part business-impact narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessImpact {
    pub financial: String,
    pub reputation: String,
    pub operations: String,
}

impl BusinessImpact {
    pub fn fallback() -> Self {
        Self {
            financial: FALLBACK_TEXT.to_string(),
            reputation: FALLBACK_TEXT.to_string(),
            operations: FALLBACK_TEXT.to_string(),
        }
    }
}

/// Where an annotation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationSource {
    Cache,
    Computed,
    Fallback,
}

/// Per-requirement enrichment result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub requirement_id: String,
    pub legal_section: String,
    pub penalty_provision: String,
    pub business_impact: BusinessImpact,
    pub source: AnnotationSource,
}

impl Annotation {
    /// Annotation for an item we could not research.
    pub fn fallback(requirement_id: impl Into<String>) -> Self {
        Self {
            requirement_id: requirement_id.into(),
            legal_section: FALLBACK_TEXT.to_string(),
            penalty_provision: FALLBACK_TEXT.to_string(),
            business_impact: BusinessImpact::fallback(),
            source: AnnotationSource::Fallback,
        }
    }

    pub fn from_cache(requirement_id: impl Into<String>, entry: &EnrichmentCacheEntry) -> Self {
        Self {
            requirement_id: requirement_id.into(),
            legal_section: entry.legal_section.clone(),
            penalty_provision: entry.penalty_provision.clone(),
            business_impact: entry.business_impact.clone(),
            source: AnnotationSource::Cache,
        }
    }
}

/// Memoized research result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentCacheEntry {
    pub cache_key: String,
    pub legal_section: String,
    pub penalty_provision: String,
    pub business_impact: BusinessImpact,
    pub created_at: DateTime<Utc>,
}

impl EnrichmentCacheEntry {
    /// Entries older than the TTL are treated as absent. A TTL that is not
    /// positive never matches; longer ones are capped at `MAX_CACHE_TTL_DAYS`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl_days: i64) -> bool {
        if ttl_days <= 0 {
            return false;
        }
        match Duration::try_days(ttl_days.min(MAX_CACHE_TTL_DAYS)) {
            Some(ttl) => now - self.created_at < ttl,
            None => false,
        }
    }
}
