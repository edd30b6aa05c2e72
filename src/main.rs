//! Compliance Notifier
//!
//! Notification and enrichment service for the compliance platform:
//! - Status-change queue coalesced into per-user digest emails
//! - Daily due-date reminder digests with in-app notifications
//! - Legal section / penalty / impact enrichment backed by search and LLM
//! - Signed one-click unsubscribe links

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::{info, warn};

use api::{router, AppState};
use digest_core::limits::{
    DEFAULT_CACHE_TTL_DAYS, DEFAULT_CLAIM_LEASE_SECS, DEFAULT_ENRICHMENT_CONCURRENCY,
    DEFAULT_FLUSH_BATCH_SIZE, DEFAULT_LLM_BATCH_SIZE, DEFAULT_MAX_SEARCHES, DEFAULT_SECTION_LIMIT,
};
use digest_core::UnsubscribeSigner;
use mailer::{EmailSender, MailerConfig, ResendMailer};
use research::{
    ChatCompletionsClient, LlmClient, LlmConfig, RegistryClient, RegistryConfig, SearchClient,
    SearchConfig, TavilyClient, TokenCache,
};
use store::{check_connection, MemoryStore, PgStore, Store, StoreConfig};
use telemetry::{health, init_tracing_from_env};
use worker::{
    DigestComposer, DigestConfig, EnrichOptions, EnrichmentOrchestrator, ReminderConfig,
    ReminderScanner, UnsubscribeLinks, WorkerConfig, WorkerScheduler,
};

/// HTTP server settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    /// Externally reachable root used in unsubscribe links
    #[serde(default = "default_public_base_url")]
    public_base_url: String,
    /// HMAC key for unsubscribe tokens
    #[serde(default)]
    unsubscribe_secret: Option<String>,
    /// Required `x-cron-secret` for job triggers; unset leaves them open
    #[serde(default)]
    cron_secret: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: default_public_base_url(),
            unsubscribe_secret: None,
            cron_secret: None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct DigestSettings {
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    #[serde(default = "default_section_limit")]
    section_limit: usize,
    #[serde(default = "default_claim_lease_secs")]
    claim_lease_secs: i64,
    #[serde(default = "default_flush_interval_secs")]
    flush_interval_secs: u64,
}

fn default_batch_size() -> usize {
    DEFAULT_FLUSH_BATCH_SIZE
}

fn default_section_limit() -> usize {
    DEFAULT_SECTION_LIMIT
}

fn default_claim_lease_secs() -> i64 {
    DEFAULT_CLAIM_LEASE_SECS
}

fn default_flush_interval_secs() -> u64 {
    5 * 60
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            section_limit: default_section_limit(),
            claim_lease_secs: default_claim_lease_secs(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ReminderSettings {
    #[serde(default = "default_reminder_interval_secs")]
    interval_secs: u64,
}

fn default_reminder_interval_secs() -> u64 {
    24 * 60 * 60
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_reminder_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct EnrichmentSettings {
    #[serde(default = "default_max_searches")]
    max_searches: usize,
    #[serde(default = "default_concurrency")]
    concurrency: usize,
    #[serde(default = "default_cache_ttl_days")]
    cache_ttl_days: i64,
    #[serde(default = "default_llm_batch_size")]
    llm_batch_size: usize,
}

fn default_max_searches() -> usize {
    DEFAULT_MAX_SEARCHES
}

fn default_concurrency() -> usize {
    DEFAULT_ENRICHMENT_CONCURRENCY
}

fn default_cache_ttl_days() -> i64 {
    DEFAULT_CACHE_TTL_DAYS
}

fn default_llm_batch_size() -> usize {
    DEFAULT_LLM_BATCH_SIZE
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            max_searches: default_max_searches(),
            concurrency: default_concurrency(),
            cache_ttl_days: default_cache_ttl_days(),
            llm_batch_size: default_llm_batch_size(),
        }
    }
}

impl From<&EnrichmentSettings> for EnrichOptions {
    fn from(settings: &EnrichmentSettings) -> Self {
        Self {
            max_searches: settings.max_searches,
            concurrency: settings.concurrency.max(1),
            cache_ttl_days: settings.cache_ttl_days,
            llm_batch_size: settings.llm_batch_size.max(1),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    store: StoreConfig,
    #[serde(default)]
    mailer: MailerConfig,
    #[serde(default)]
    search: SearchConfig,
    #[serde(default)]
    llm: LlmConfig,
    #[serde(default)]
    registry: RegistryConfig,
    #[serde(default)]
    digest: DigestSettings,
    #[serde(default)]
    reminders: ReminderSettings,
    #[serde(default)]
    enrichment: EnrichmentSettings,
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23+ requires an explicit crypto provider before any TLS use
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        bail!("Failed to install rustls crypto provider");
    }

    dotenvy::dotenv().ok();
    init_tracing_from_env();

    info!("Starting Compliance Notifier v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    let store = connect_store(&config.store).await?;
    let mailer = build_mailer(&config.mailer)?;

    let secret = config
        .server
        .unsubscribe_secret
        .clone()
        .filter(|s| !s.is_empty())
        .context("UNSUBSCRIBE_SECRET must be set")?;
    let signer = UnsubscribeSigner::new(secret);
    let links = UnsubscribeLinks::new(&config.server.public_base_url, signer.clone())
        .context("Invalid public_base_url")?;

    let digest = Arc::new(DigestComposer::new(
        store.clone(),
        mailer.clone(),
        links.clone(),
        DigestConfig {
            batch_size: config.digest.batch_size,
            section_limit: config.digest.section_limit,
            claim_lease: chrono::Duration::seconds(config.digest.claim_lease_secs),
        },
    ));
    let reminders = Arc::new(ReminderScanner::new(
        store.clone(),
        mailer,
        links,
        ReminderConfig {
            section_limit: config.digest.section_limit,
        },
    ));

    let enrichment = build_enrichment(&config, store.clone())?;
    let registry = RegistryClient::from_config(
        &config.registry,
        TokenCache::new(Duration::from_secs(config.registry.token_ttl_secs)),
    )
    .context("Failed to create registry client")?;
    if registry.is_none() {
        warn!("Registry credentials missing; registry lookups disabled");
    }

    let scheduler = Arc::new(WorkerScheduler::new(
        WorkerConfig {
            flush_interval: Duration::from_secs(config.digest.flush_interval_secs),
            reminder_interval: Duration::from_secs(config.reminders.interval_secs),
        },
        digest.clone(),
        reminders.clone(),
    ));
    let _worker_handles = scheduler.start();

    let state = AppState::new(store, digest, reminders, signer)
        .with_enrichment(enrichment)
        .with_registry(registry)
        .with_cron_secret(config.server.cron_secret.clone());

    let _rate_limiter_cleanup = state.start_rate_limiter_cleanup();
    info!("Started rate limiter cleanup task (every 5 minutes)");

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("COMPLIANCE")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Conventional unprefixed names for secrets, as set by most hosts
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.store.url = Some(url);
    }
    if let Ok(key) = std::env::var("RESEND_API_KEY") {
        config.mailer.api_key = Some(key);
    }
    if let Ok(from) = std::env::var("EMAIL_FROM") {
        config.mailer.from = from;
    }
    if let Ok(key) = std::env::var("TAVILY_API_KEY") {
        config.search.api_key = Some(key);
    }
    if let Ok(key) = std::env::var("LLM_API_KEY") {
        config.llm.api_key = Some(key);
    }
    if let Ok(secret) = std::env::var("UNSUBSCRIBE_SECRET") {
        config.server.unsubscribe_secret = Some(secret);
    }
    if let Ok(secret) = std::env::var("CRON_SECRET") {
        config.server.cron_secret = Some(secret);
    }
    if let Ok(url) = std::env::var("PUBLIC_BASE_URL") {
        config.server.public_base_url = url;
    }
    if let Ok(url) = std::env::var("REGISTRY_BASE_URL") {
        config.registry.base_url = Some(url);
    }
    if let Ok(id) = std::env::var("REGISTRY_CLIENT_ID") {
        config.registry.client_id = Some(id);
    }
    if let Ok(secret) = std::env::var("REGISTRY_CLIENT_SECRET") {
        config.registry.client_secret = Some(secret);
    }

    Ok(config)
}

/// Postgres when a URL is configured, otherwise the in-memory store.
async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    if config.url.as_deref().is_some_and(|u| !u.is_empty()) {
        let store = PgStore::connect(config)
            .await
            .context("Failed to connect to PostgreSQL")?;
        check_connection(&store).await;
        Ok(Arc::new(store))
    } else {
        warn!("No database url configured; using in-memory store (data is lost on restart)");
        health().database.set_healthy();
        Ok(Arc::new(MemoryStore::new()))
    }
}

fn build_mailer(config: &MailerConfig) -> Result<Option<Arc<dyn EmailSender>>> {
    let mailer = ResendMailer::from_config(config).context("Failed to create mailer")?;
    health().mailer.set_configured(mailer.is_some());
    if mailer.is_none() {
        warn!("Mailer API key missing; digest and reminder runs are disabled");
    }
    Ok(mailer.map(|m| Arc::new(m) as Arc<dyn EmailSender>))
}

/// Enrichment needs both search and LLM credentials.
fn build_enrichment(config: &Config, store: Arc<dyn Store>) -> Result<Option<Arc<EnrichmentOrchestrator>>> {
    let search = TavilyClient::from_config(&config.search).context("Failed to create search client")?;
    let llm = ChatCompletionsClient::from_config(&config.llm).context("Failed to create LLM client")?;

    health().search.set_configured(search.is_some());
    health().llm.set_configured(llm.is_some());

    match (search, llm) {
        (Some(search), Some(llm)) => {
            let search: Arc<dyn SearchClient> = Arc::new(search);
            let llm: Arc<dyn LlmClient> = Arc::new(llm);
            Ok(Some(Arc::new(EnrichmentOrchestrator::new(
                store,
                search,
                llm,
                EnrichOptions::from(&config.enrichment),
            ))))
        }
        _ => {
            warn!("Search or LLM credentials missing; enrichment is disabled");
            Ok(None)
        }
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
