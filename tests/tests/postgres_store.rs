//! Postgres store semantics against a real database.
//!
//! Requires Docker for testcontainers, or `COMPLIANCE_TEST_DATABASE_URL`
//! pointing at a scratch database.

use chrono::{Duration, Utc};
use digest_core::{
    BusinessImpact, EmailPreference, EnrichmentCacheEntry, InAppNotification, RequirementStatus,
};
use integration_tests::containers::TestDatabase;
use integration_tests::fixtures::{status_change, today};
use store::{EnrichmentCacheStore, PgStore, PreferenceStore, QueueStore, ReminderStore};
use uuid::Uuid;

const LEASE_MINUTES: i64 = 10;

async fn seed_directory(store: &PgStore) {
    for sql in [
        "INSERT INTO companies (id, name) VALUES ('co-1', 'Acme Pvt Ltd'), ('co-2', 'Globex Ltd')
         ON CONFLICT DO NOTHING",
        "INSERT INTO users (id, email, name, role, company_id) VALUES
           ('admin-1', 'admin-1@example.com', 'Asha', 'admin', 'co-1'),
           ('member-1', 'member-1@example.com', NULL, 'user', 'co-1'),
           ('admin-2', 'admin-2@example.com', NULL, 'admin', 'co-2'),
           ('root', 'root@example.com', NULL, 'superadmin', NULL)
         ON CONFLICT DO NOTHING",
        "INSERT INTO compliance_requirements (id, company_id, requirement, due_date, status) VALUES
           ('req-open', 'co-1', 'Annual return', CURRENT_DATE + 7, 'pending'),
           ('req-done', 'co-1', 'Board minutes', CURRENT_DATE + 1, 'completed')
         ON CONFLICT DO NOTHING",
    ] {
        sqlx::query(sql).execute(store.pool()).await.unwrap();
    }
}

#[tokio::test]
async fn test_postgres_store_semantics() {
    let db = TestDatabase::start().await;
    let store = db.store().await;
    let lease = Duration::minutes(LEASE_MINUTES);
    // unique per run so a reused database does not leak state between runs
    let user = format!("pg-user-{}", Uuid::new_v4());

    // claim is exclusive and completion is token-guarded
    let a = store
        .enqueue(status_change(&user, "co-1", "x", RequirementStatus::Pending, RequirementStatus::Completed))
        .await
        .unwrap();
    let b = store
        .enqueue(status_change(&user, "co-1", "y", RequirementStatus::Pending, RequirementStatus::Overdue))
        .await
        .unwrap();
    let ids = vec![a.id, b.id];

    let pending = store.fetch_pending(100, lease).await.unwrap();
    assert!(ids.iter().all(|id| pending.iter().any(|p| p.id == *id)));
    let fetched = pending.iter().find(|p| p.id == a.id).unwrap();
    assert_eq!(fetched.payload, a.payload);

    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let mut claimed = store.claim(&ids, first, lease).await.unwrap();
    claimed.sort();
    let mut expected = ids.clone();
    expected.sort();
    assert_eq!(claimed, expected);
    assert!(store.claim(&ids, second, lease).await.unwrap().is_empty());
    assert_eq!(store.complete_claim(&ids, second).await.unwrap(), 0);

    let still_pending = store.fetch_pending(100, lease).await.unwrap();
    assert!(!still_pending.iter().any(|p| ids.contains(&p.id)));

    // release makes the rows claimable again
    assert_eq!(store.release_claim(&ids, first).await.unwrap(), 2);
    assert_eq!(store.claim(&ids, second, lease).await.unwrap().len(), 2);
    assert_eq!(store.complete_claim(&ids, second).await.unwrap(), 2);
    assert!(store.claim(&ids, first, lease).await.unwrap().is_empty());
    assert_eq!(store.mark_suppressed(&ids, lease).await.unwrap(), 0);

    // an expired lease can be taken over
    let c = store
        .enqueue(status_change(&user, "co-1", "z", RequirementStatus::NotStarted, RequirementStatus::Pending))
        .await
        .unwrap();
    store.claim(&[c.id], first, lease).await.unwrap();
    assert_eq!(store.claim(&[c.id], second, Duration::zero()).await.unwrap(), vec![c.id]);

    // preferences: missing row, then upsert twice
    assert!(store
        .load_preferences(std::slice::from_ref(&user))
        .await
        .unwrap()
        .is_empty());
    let mut pref = EmailPreference::subscribed(user.clone());
    pref.unsubscribe_reminders = true;
    store.upsert_preference(&pref).await.unwrap();
    pref.unsubscribe_all = true;
    store.upsert_preference(&pref).await.unwrap();
    let loaded = store.load_preferences(std::slice::from_ref(&user)).await.unwrap();
    assert_eq!(loaded.get(&user), Some(&pref));

    // reminder reads
    seed_directory(&store).await;
    let open = store.open_requirements().await.unwrap();
    assert!(open.iter().any(|r| r.id == "req-open" && r.company_name == "Acme Pvt Ltd"));
    assert!(!open.iter().any(|r| r.id == "req-done"));

    let mut recipients: Vec<String> = store
        .reminder_recipients(&["co-1".to_string()])
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.user_id)
        .collect();
    recipients.sort();
    assert_eq!(recipients, vec!["admin-1".to_string(), "root".to_string()]);

    // idempotency log
    assert!(!store.has_log_entry("admin-1", today(), "reminder_digest").await.unwrap());
    store.insert_log_entry("admin-1", today(), "reminder_digest").await.unwrap();
    store.insert_log_entry("admin-1", today(), "reminder_digest").await.unwrap();
    assert!(store.has_log_entry("admin-1", today(), "reminder_digest").await.unwrap());

    let written = store
        .insert_in_app_notifications(&[InAppNotification {
            user_id: "admin-1".into(),
            company_id: "co-1".into(),
            requirement_id: "req-open".into(),
            title: "Compliance deadline approaching".into(),
            message: "Annual return is due in 7 days.".into(),
            created_at: Utc::now(),
        }])
        .await
        .unwrap();
    assert_eq!(written, 1);

    // enrichment cache: last write wins
    let mut entry = EnrichmentCacheEntry {
        cache_key: "pg-test-key".into(),
        legal_section: "Section 92".into(),
        penalty_provision: "Rs. 100 per day".into(),
        business_impact: BusinessImpact::fallback(),
        created_at: Utc::now(),
    };
    store.upsert_cached(&[entry.clone()]).await.unwrap();
    entry.legal_section = "Section 137".into();
    store.upsert_cached(&[entry.clone()]).await.unwrap();
    let cached = store.get_cached(&["pg-test-key".to_string()]).await.unwrap();
    assert_eq!(cached["pg-test-key"].legal_section, "Section 137");
    assert_eq!(cached["pg-test-key"].business_impact, entry.business_impact);
}
