//! Lazy, bounded connection pools and the per-operation transaction unit.

use std::sync::Arc;

use dashmap::DashMap;
use datatable::{ConnectInfo, ErrorKind, PoolSettings, TableError};
use futures_util::future::BoxFuture;
use sqlx::pool::PoolOptions;
use sqlx::Pool;
use tokio::sync::OnceCell;

use crate::backend::Backend;
use crate::error::SqlxErrorExt;

/// Owns the connection pool for one store.
///
/// Cheap to clone: clones share the same lazily created pool. The first
/// operation connects; a failed connect surfaces as `ConnectionFailed` and
/// leaves the pool unset, so the next operation tries again.
pub struct ConnectionManager<DB: Backend> {
    inner: Arc<Inner<DB>>,
}

struct Inner<DB: Backend> {
    info: ConnectInfo,
    settings: PoolSettings,
    pool: OnceCell<Pool<DB>>,
}

impl<DB: Backend> Clone for ConnectionManager<DB> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<DB: Backend> ConnectionManager<DB> {
    pub fn new(info: ConnectInfo, settings: PoolSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                info,
                settings,
                pool: OnceCell::new(),
            }),
        }
    }

    /// Wrap a pool built elsewhere.
    pub fn from_pool(pool: Pool<DB>, info: ConnectInfo, settings: PoolSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                info,
                settings,
                pool: OnceCell::new_with(Some(pool)),
            }),
        }
    }

    pub fn connect_info(&self) -> &ConnectInfo {
        &self.inner.info
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.inner.settings
    }

    pub fn is_connected(&self) -> bool {
        self.inner.pool.get().is_some_and(|pool| !pool.is_closed())
    }

    /// The pool, connecting on first use.
    pub async fn pool(&self) -> Result<&Pool<DB>, TableError> {
        self.inner.pool.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<Pool<DB>, TableError> {
        let info = &self.inner.info;
        let settings = &self.inner.settings;
        let options = DB::connect_options(info)?;
        let pool = PoolOptions::<DB>::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(settings.idle_timeout)
            .max_lifetime(settings.max_lifetime)
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::warn!(host = %info.host, db = %info.db, error = %e, "connection failed");
                TableError::with_source(ErrorKind::ConnectionFailed, e)
            })?;
        tracing::info!(
            host = %info.host,
            db = %info.db,
            max_connections = settings.max_connections,
            "connection pool established"
        );
        Ok(pool)
    }

    /// Run `f` as one unit: begin, run under the statement deadline, commit.
    ///
    /// Any error (or the deadline expiring) rolls the transaction back before
    /// the error is returned, so a failed unit leaves no partial effects and
    /// the connection goes back to the pool usable.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T, TableError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut DB::Connection) -> BoxFuture<'c, Result<T, TableError>> + Send,
    {
        let pool = self.pool().await?;
        let deadline = self.inner.settings.statement_timeout;
        let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_table_error)?;

        let outcome = match tokio::time::timeout(deadline, f(&mut *tx)).await {
            Ok(result) => result,
            Err(_) => Err(TableError::timeout(format!(
                "statement did not complete within {deadline:?}"
            ))),
        };

        match outcome {
            Ok(value) => match tokio::time::timeout(deadline, tx.commit()).await {
                Ok(Ok(())) => Ok(value),
                Ok(Err(e)) => Err(e.into_table_error()),
                Err(_) => Err(TableError::timeout(format!(
                    "commit did not complete within {deadline:?}"
                ))),
            },
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                tracing::warn!(kind = %err.kind(), error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }

    /// Close the pool. A later operation reconnects only on a fresh manager.
    pub async fn close(&self) {
        if let Some(pool) = self.inner.pool.get() {
            pool.close().await;
            tracing::info!(db = %self.inner.info.db, "connection pool closed");
        }
    }
}

/// One shared [`ConnectionManager`] per store, keyed by
/// [`ConnectInfo::store_id`].
///
/// Tables addressing the same store share its pool. Handed to tables
/// explicitly instead of living in a global.
pub struct ConnectionManagers<DB: Backend> {
    settings: PoolSettings,
    managers: Arc<DashMap<String, ConnectionManager<DB>>>,
}

impl<DB: Backend> Clone for ConnectionManagers<DB> {
    fn clone(&self) -> Self {
        Self {
            settings: self.settings.clone(),
            managers: self.managers.clone(),
        }
    }
}

impl<DB: Backend> ConnectionManagers<DB> {
    pub fn new(settings: PoolSettings) -> Self {
        Self {
            settings,
            managers: Arc::new(DashMap::new()),
        }
    }

    /// The manager for `info`'s store, created (unconnected) on first request.
    pub fn manager_for(&self, info: &ConnectInfo) -> ConnectionManager<DB> {
        self.managers
            .entry(info.store_id())
            .or_insert_with(|| ConnectionManager::new(info.clone(), self.settings.clone()))
            .clone()
    }

    /// Register a pre-built manager under its store id.
    pub fn insert(&self, manager: ConnectionManager<DB>) {
        self.managers
            .insert(manager.connect_info().store_id(), manager);
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    pub async fn close_all(&self) {
        let managers: Vec<_> = self.managers.iter().map(|e| e.value().clone()).collect();
        for manager in managers {
            manager.close().await;
        }
    }
}
