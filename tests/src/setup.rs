//! Common test setup.

use api::{router, state::AppState};
use axum::Router;
use axum_test::TestServer;
use digest_core::{UnsubscribeKind, UnsubscribeSigner};
use mailer::EmailSender;
use research::{LlmClient, SearchClient};
use std::sync::Arc;
use store::{MemoryStore, Store};
use telemetry::health;
use worker::{
    DigestComposer, DigestConfig, EnrichOptions, EnrichmentOrchestrator, ReminderConfig,
    ReminderScanner, UnsubscribeLinks,
};

use crate::mocks::{MockLlm, MockMailer, MockSearch};

pub const UNSUBSCRIBE_SECRET: &str = "integration-test-secret";
pub const PUBLIC_BASE_URL: &str = "https://notify.example.com";
pub const CRON_SECRET: &str = "cron-test-secret";

/// Full pipeline over the in-memory store with mocked providers.
///
/// The router is the production router with every layer; only the
/// outbound providers are replaced.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub mailer: MockMailer,
    pub search: MockSearch,
    pub llm: MockLlm,
    pub signer: UnsubscribeSigner,
    pub digest: Arc<DigestComposer>,
    pub reminders: Arc<ReminderScanner>,
    pub enrichment: Arc<EnrichmentOrchestrator>,
    pub router: Router,
}

impl TestContext {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Context whose job endpoints require [`CRON_SECRET`].
    pub fn with_cron_secret() -> Self {
        Self::build(Some(CRON_SECRET.to_string()))
    }

    fn build(cron_secret: Option<String>) -> Self {
        health().database.set_healthy();

        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();
        let mailer = MockMailer::new();
        let search = MockSearch::new();
        let llm = MockLlm::new();

        let signer = UnsubscribeSigner::new(UNSUBSCRIBE_SECRET);
        let links = UnsubscribeLinks::new(PUBLIC_BASE_URL, signer.clone()).expect("valid base url");
        let sender: Arc<dyn EmailSender> = Arc::new(mailer.clone());

        let digest = Arc::new(DigestComposer::new(
            dyn_store.clone(),
            Some(sender.clone()),
            links.clone(),
            DigestConfig::default(),
        ));
        let reminders = Arc::new(ReminderScanner::new(
            dyn_store.clone(),
            Some(sender),
            links,
            ReminderConfig::default(),
        ));
        let enrichment = Arc::new(EnrichmentOrchestrator::new(
            dyn_store.clone(),
            Arc::new(search.clone()) as Arc<dyn SearchClient>,
            Arc::new(llm.clone()) as Arc<dyn LlmClient>,
            EnrichOptions::default(),
        ));

        let state = AppState::new(dyn_store, digest.clone(), reminders.clone(), signer.clone())
            .with_enrichment(Some(enrichment.clone()))
            .with_cron_secret(cron_secret);
        let router = router(state);

        Self {
            store,
            mailer,
            search,
            llm,
            signer,
            digest,
            reminders,
            enrichment,
            router,
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }

    pub fn token(&self, user_id: &str, kind: UnsubscribeKind) -> String {
        self.signer.generate(user_id, kind)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Router with no mailer and no enrichment providers configured.
pub fn unconfigured_router() -> Router {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let signer = UnsubscribeSigner::new(UNSUBSCRIBE_SECRET);
    let links = UnsubscribeLinks::new(PUBLIC_BASE_URL, signer.clone()).expect("valid base url");

    let digest = Arc::new(DigestComposer::new(store.clone(), None, links.clone(), DigestConfig::default()));
    let reminders = Arc::new(ReminderScanner::new(store.clone(), None, links, ReminderConfig::default()));

    router(AppState::new(store, digest, reminders, signer))
}
