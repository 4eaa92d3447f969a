//! Database connection registry
//!
//! `Database` owns the Postgres dialector (connect options) and the pool that
//! is opened from it. Both live behind their own lock so that reconfiguring
//! the dialector and opening the pool never contend with plain readers.
//!
//! # Usage Pattern
//!
//! ```ignore
//! let db = Arc::new(Database::from_config(&DatabaseConfig::from_env())?);
//! let manager = TransactionManager::new(Arc::clone(&db));
//!
//! let tx = manager.get_and_start();
//! let errors = tx.subscribe_error();
//! tx.execute_statement(&mut stmt).await?;
//! tx.commit().await?;
//! ```
//!
//! Tests call `invalidate` / `invalidate_dialector` to drop shared state
//! between cases instead of relying on process globals.

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Postgres;

use crate::config::{DatabaseConfig, PoolSettings};
use crate::engine::Backend;
use crate::services::error::{Error, Result};

/// The physical transaction handle statements receive
pub type PgTransaction = sqlx::Transaction<'static, Postgres>;

pub struct Database {
    settings: PoolSettings,
    dialector: RwLock<Option<PgConnectOptions>>,
    pool: RwLock<Option<PgPool>>,
}

impl Database {
    /// An unconfigured registry; `pool()` fails until `configure` is called.
    pub fn new(settings: PoolSettings) -> Self {
        Self {
            settings,
            dialector: RwLock::new(None),
            pool: RwLock::new(None),
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let db = Self::new(config.pool.clone());
        db.configure(config.connect_options()?);
        Ok(db)
    }

    /// Install or replace the dialector. Any pool opened from the previous
    /// one is forgotten; its connections close once in-flight users finish.
    pub fn configure(&self, options: PgConnectOptions) {
        *self.dialector.write() = Some(options);
        self.pool.write().take();
    }

    pub fn is_configured(&self) -> bool {
        self.dialector.read().is_some()
    }

    /// The pool, opened lazily on first use.
    pub fn pool(&self) -> Result<PgPool> {
        if let Some(pool) = self.pool.read().as_ref() {
            return Ok(pool.clone());
        }

        let mut slot = self.pool.write();
        // another caller may have opened it while we waited
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }

        let options = self
            .dialector
            .read()
            .clone()
            .ok_or(Error::DialectorNotInitialized)?;

        let pool = PgPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .acquire_timeout(self.settings.acquire_timeout)
            .connect_lazy_with(options);

        tracing::debug!(
            max_connections = self.settings.max_connections,
            "opened database pool"
        );
        *slot = Some(pool.clone());
        Ok(pool)
    }

    /// Close and forget the pool. The next `pool()` opens a fresh one.
    pub async fn invalidate(&self) {
        let pool = self.pool.write().take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::info!("database pool invalidated");
        }
    }

    /// `invalidate`, then forget the dialector as well
    pub async fn invalidate_dialector(&self) {
        self.invalidate().await;
        self.dialector.write().take();
        tracing::info!("database dialector invalidated");
    }
}

#[async_trait]
impl Backend for Database {
    type Handle = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction> {
        let pool = self.pool()?;
        Ok(pool.begin().await?)
    }

    async fn commit(&self, handle: PgTransaction) -> Result<()> {
        Ok(handle.commit().await?)
    }

    async fn rollback(&self, handle: PgTransaction) -> Result<()> {
        Ok(handle.rollback().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> PgConnectOptions {
        PgConnectOptions::new()
            .host("localhost")
            .username("blog")
            .database("blog")
    }

    #[test]
    fn test_pool_requires_dialector() {
        let db = Database::new(PoolSettings::default());
        assert!(!db.is_configured());
        assert!(matches!(db.pool(), Err(Error::DialectorNotInitialized)));
    }

    #[tokio::test]
    async fn test_pool_is_opened_once() {
        let db = Database::new(PoolSettings::default());
        db.configure(options());

        let first = db.pool().unwrap();
        let second = db.pool().unwrap();
        assert_eq!(
            first.options().get_max_connections(),
            second.options().get_max_connections()
        );
        assert!(db.pool.read().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_keeps_dialector() {
        let db = Database::new(PoolSettings::default());
        db.configure(options());
        let pool = db.pool().unwrap();

        db.invalidate().await;
        assert!(pool.is_closed());
        assert!(db.pool.read().is_none());
        assert!(db.is_configured());
        assert!(db.pool().is_ok());
    }

    #[tokio::test]
    async fn test_invalidate_dialector_resets_everything() {
        let db = Database::new(PoolSettings::default());
        db.configure(options());
        db.pool().unwrap();

        db.invalidate_dialector().await;
        assert!(!db.is_configured());
        assert!(matches!(db.pool(), Err(Error::DialectorNotInitialized)));
    }

    #[tokio::test]
    async fn test_begin_without_dialector_fails() {
        let db = Database::new(PoolSettings::default());
        assert!(matches!(
            db.begin().await,
            Err(Error::DialectorNotInitialized)
        ));
    }
}
