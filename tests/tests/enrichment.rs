//! Enrichment orchestration with mocked search and LLM.

use chrono::{Duration, Utc};
use digest_core::{
    cache_key, limits::FALLBACK_TEXT, AnnotationSource, BusinessImpact, EnrichmentCacheEntry,
};
use integration_tests::fixtures::requirement_input;
use integration_tests::setup::TestContext;
use worker::EnrichOptions;

const ANNUAL_RETURN: &str = "File annual return in Form MGT-7 within 60 days of AGM";

#[tokio::test]
async fn test_identical_text_researched_once() {
    let ctx = TestContext::new();
    let options = EnrichOptions::default();

    let first = ctx
        .enrichment
        .enrich(&[requirement_input("r1", ANNUAL_RETURN)], &options)
        .await;
    let second = ctx
        .enrichment
        .enrich(&[requirement_input("r2", ANNUAL_RETURN)], &options)
        .await;

    assert_eq!(ctx.search.call_count(), 1);
    assert_eq!(ctx.llm.call_count(), 1);
    assert_eq!(first[0].source, AnnotationSource::Computed);
    assert_eq!(second[0].source, AnnotationSource::Cache);
    assert_eq!(second[0].requirement_id, "r2");
    assert_eq!(second[0].legal_section, first[0].legal_section);
}

#[tokio::test]
async fn test_every_provider_failing_still_returns_one_per_input() {
    let ctx = TestContext::new();
    ctx.search.set_should_fail(true);
    ctx.llm.set_should_fail(true);

    let items: Vec<_> = (0..5)
        .map(|i| requirement_input(&format!("r{}", i), &format!("Distinct filing obligation {}", i)))
        .collect();
    let out = ctx.enrichment.enrich(&items, &EnrichOptions::default()).await;

    assert_eq!(out.len(), 5);
    for (annotation, item) in out.iter().zip(&items) {
        assert_eq!(annotation.requirement_id, item.id);
        assert_eq!(annotation.business_impact.financial, FALLBACK_TEXT);
    }
    assert!(ctx.store.cache_entries().is_empty());
}

#[tokio::test]
async fn test_llm_failure_falls_back_to_search_hints_without_caching() {
    let ctx = TestContext::new();
    ctx.llm.set_should_fail(true);

    let out = ctx
        .enrichment
        .enrich(&[requirement_input("r1", ANNUAL_RETURN)], &EnrichOptions::default())
        .await;

    assert_eq!(out[0].legal_section, "Section 92");
    assert!(out[0].penalty_provision.starts_with("Rs. 100"));
    assert!(ctx.store.cache_entries().is_empty());
}

#[tokio::test]
async fn test_search_cap_limits_external_calls() {
    let ctx = TestContext::new();
    let items: Vec<_> = (0..6)
        .map(|i| requirement_input(&format!("r{}", i), &format!("Obligation number {}", i)))
        .collect();
    let options = EnrichOptions {
        max_searches: 2,
        ..EnrichOptions::default()
    };

    let out = ctx.enrichment.enrich(&items, &options).await;

    assert_eq!(out.len(), 6);
    assert_eq!(ctx.search.call_count(), 2);
    let computed = out
        .iter()
        .filter(|a| a.source == AnnotationSource::Computed)
        .count();
    assert_eq!(computed, 2);
}

#[tokio::test]
async fn test_stale_cache_entry_is_refreshed() {
    let ctx = TestContext::new();
    let item = requirement_input("r1", ANNUAL_RETURN);
    ctx.store.put_cache_entry(EnrichmentCacheEntry {
        cache_key: cache_key(&item.category, &item.requirement),
        legal_section: "Old section".into(),
        penalty_provision: "Old penalty".into(),
        business_impact: BusinessImpact::fallback(),
        created_at: Utc::now() - Duration::days(90),
    });

    let out = ctx.enrichment.enrich(&[item], &EnrichOptions::default()).await;

    assert_eq!(ctx.search.call_count(), 1);
    assert_eq!(out[0].source, AnnotationSource::Computed);
    assert_ne!(out[0].legal_section, "Old section");
}
