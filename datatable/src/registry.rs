use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::TableError;

/// Composite registry key: which store, which entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub store: String,
    pub entity: String,
}

impl TableKey {
    pub fn new(store: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            entity: entity.into(),
        }
    }
}

impl std::fmt::Display for TableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.store, self.entity)
    }
}

/// A thread-safe map from [`TableKey`] to a live table instance, backed by `DashMap`.
///
/// Each key owns a `OnceCell`, so concurrent first accesses to the same key
/// construct exactly one instance; the losers await the winner's result. A
/// failed construction leaves the cell empty and the next caller retries.
/// There is no eviction.
pub struct TableRegistry<T> {
    inner: Arc<DashMap<TableKey, Arc<OnceCell<Arc<T>>>>>,
}

impl<T> Clone for TableRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for TableRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TableRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Return the instance for `key`, constructing it with `create` on first use.
    pub async fn get_or_try_create<F, Fut>(&self, key: &TableKey, create: F) -> Result<Arc<T>, TableError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, TableError>>,
    {
        // Clone the cell out so no DashMap guard is held across the await.
        let cell = self
            .inner
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let table = cell
            .get_or_try_init(|| async move {
                tracing::debug!(table = %key, "constructing table instance");
                create().await.map(Arc::new)
            })
            .await?;
        Ok(table.clone())
    }

    /// The live instance for `key`, if one has been constructed.
    pub fn get(&self, key: &TableKey) -> Option<Arc<T>> {
        self.inner.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Drop the registry's handle on `key`. Callers holding an `Arc` keep theirs.
    pub fn remove(&self, key: &TableKey) -> Option<Arc<T>> {
        self.inner
            .remove(key)
            .and_then(|(_, cell)| cell.get().cloned())
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.inner.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
