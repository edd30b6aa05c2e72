//! Enrichment cache persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use digest_core::{BusinessImpact, EnrichmentCacheEntry, Result};
use sqlx::types::Json;
use sqlx::QueryBuilder;
use std::collections::HashMap;

use crate::client::{store_err, PgStore};
use crate::traits::EnrichmentCacheStore;

#[derive(Debug, sqlx::FromRow)]
struct CacheRow {
    cache_key: String,
    legal_section: String,
    penalty_provision: String,
    business_impact: Json<BusinessImpact>,
    created_at: DateTime<Utc>,
}

impl From<CacheRow> for EnrichmentCacheEntry {
    fn from(row: CacheRow) -> Self {
        Self {
            cache_key: row.cache_key,
            legal_section: row.legal_section,
            penalty_provision: row.penalty_provision,
            business_impact: row.business_impact.0,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl EnrichmentCacheStore for PgStore {
    async fn get_cached(&self, keys: &[String]) -> Result<HashMap<String, EnrichmentCacheEntry>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<CacheRow> = sqlx::query_as(
            "SELECT cache_key, legal_section, penalty_provision, business_impact, created_at
             FROM enrichment_cache
             WHERE cache_key = ANY($1)",
        )
        .bind(keys)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;

        Ok(rows
            .into_iter()
            .map(|row| (row.cache_key.clone(), EnrichmentCacheEntry::from(row)))
            .collect())
    }

    async fn upsert_cached(&self, entries: &[EnrichmentCacheEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::new(
            "INSERT INTO enrichment_cache
             (cache_key, legal_section, penalty_provision, business_impact, created_at) ",
        );
        builder.push_values(entries, |mut row, e| {
            row.push_bind(&e.cache_key)
                .push_bind(&e.legal_section)
                .push_bind(&e.penalty_provision)
                .push_bind(Json(&e.business_impact))
                .push_bind(e.created_at);
        });
        builder.push(
            " ON CONFLICT (cache_key) DO UPDATE SET
                legal_section = EXCLUDED.legal_section,
                penalty_provision = EXCLUDED.penalty_provision,
                business_impact = EXCLUDED.business_impact,
                created_at = EXCLUDED.created_at",
        );

        builder
            .build()
            .execute(self.pool())
            .await
            .map_err(store_err)?;

        Ok(())
    }
}
