//! Email preference persistence.

use async_trait::async_trait;
use digest_core::{DigestFrequency, EmailPreference, Result};
use std::collections::HashMap;

use crate::client::{store_err, PgStore};
use crate::traits::PreferenceStore;

#[derive(Debug, sqlx::FromRow)]
struct PreferenceRow {
    user_id: String,
    unsubscribe_all: bool,
    unsubscribe_status_changes: bool,
    unsubscribe_reminders: bool,
    unsubscribe_team_updates: bool,
    digest_frequency: String,
}

impl From<PreferenceRow> for EmailPreference {
    fn from(row: PreferenceRow) -> Self {
        Self {
            user_id: row.user_id,
            unsubscribe_all: row.unsubscribe_all,
            unsubscribe_status_changes: row.unsubscribe_status_changes,
            unsubscribe_reminders: row.unsubscribe_reminders,
            unsubscribe_team_updates: row.unsubscribe_team_updates,
            // unknown values fall back to the default cadence
            digest_frequency: DigestFrequency::parse(&row.digest_frequency).unwrap_or_default(),
        }
    }
}

#[async_trait]
impl PreferenceStore for PgStore {
    async fn load_preferences(&self, user_ids: &[String]) -> Result<HashMap<String, EmailPreference>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<PreferenceRow> = sqlx::query_as(
            "SELECT user_id, unsubscribe_all, unsubscribe_status_changes,
                    unsubscribe_reminders, unsubscribe_team_updates, digest_frequency
             FROM email_preferences
             WHERE user_id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;

        Ok(rows
            .into_iter()
            .map(|row| (row.user_id.clone(), EmailPreference::from(row)))
            .collect())
    }

    async fn upsert_preference(&self, preference: &EmailPreference) -> Result<()> {
        sqlx::query(
            "INSERT INTO email_preferences
             (user_id, unsubscribe_all, unsubscribe_status_changes, unsubscribe_reminders,
              unsubscribe_team_updates, digest_frequency, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW())
             ON CONFLICT (user_id) DO UPDATE SET
                unsubscribe_all = EXCLUDED.unsubscribe_all,
                unsubscribe_status_changes = EXCLUDED.unsubscribe_status_changes,
                unsubscribe_reminders = EXCLUDED.unsubscribe_reminders,
                unsubscribe_team_updates = EXCLUDED.unsubscribe_team_updates,
                digest_frequency = EXCLUDED.digest_frequency,
                updated_at = NOW()",
        )
        .bind(&preference.user_id)
        .bind(preference.unsubscribe_all)
        .bind(preference.unsubscribe_status_changes)
        .bind(preference.unsubscribe_reminders)
        .bind(preference.unsubscribe_team_updates)
        .bind(preference.digest_frequency.as_str())
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        Ok(())
    }
}
