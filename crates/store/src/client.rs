//! Postgres store handle.

use crate::config::StoreConfig;
use digest_core::{Error, Result, StoreErrorCode};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Postgres-backed store with connection pooling.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and (optionally) apply embedded migrations.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| Error::unavailable("database url not configured"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(url)
            .await
            .map_err(store_err)?;

        info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL"
        );

        if config.run_migrations {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| Error::store(StoreErrorCode::QueryFailed, format!("migration failed: {}", e)))?;
            info!("Database migrations applied");
        }

        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the inner pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a sqlx error into our store error.
pub(crate) fn store_err(e: sqlx::Error) -> Error {
    Error::store(StoreErrorCode::QueryFailed, e.to_string())
}

/// Seconds of a chrono duration as a float for `make_interval`.
pub(crate) fn lease_secs(lease: chrono::Duration) -> f64 {
    lease.num_milliseconds() as f64 / 1000.0
}
