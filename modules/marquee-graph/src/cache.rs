use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use tracing::{error, info};

use crate::reader::MovieCatalog;

/// Snapshot of every known movie title, used for fuzzy matching.
#[derive(Debug, Default)]
pub struct TitleSnapshot {
    pub titles: Vec<String>,
    pub loaded_at: Option<Instant>,
}

impl TitleSnapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.loaded_at.is_some_and(|at| at.elapsed() < ttl)
    }
}

/// Title list with atomic swap for lock-free reads. Expired snapshots are
/// refreshed lazily on the next access; there is no invalidation on write.
pub struct TitleCache {
    inner: ArcSwap<TitleSnapshot>,
    reloading: AtomicBool,
    ttl: Duration,
}

impl TitleCache {
    /// Create an empty cache. The first `get` loads from the catalog.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(TitleSnapshot::default())),
            reloading: AtomicBool::new(false),
            ttl,
        }
    }

    /// Current titles, reloading first if the snapshot has expired. A failed
    /// reload keeps serving the stale snapshot; a failed first load is an error.
    pub async fn get(
        &self,
        catalog: &dyn MovieCatalog,
    ) -> Result<Arc<TitleSnapshot>, neo4rs::Error> {
        let snap = self.inner.load_full();
        if snap.is_fresh(self.ttl) {
            return Ok(snap);
        }

        if snap.loaded_at.is_none() {
            return self.reload(catalog).await;
        }

        // Another task is already refreshing; serve stale data meanwhile
        let Some(_guard) = ReloadGuard::acquire(&self.reloading) else {
            return Ok(snap);
        };

        match self.load(catalog).await {
            Ok(fresh) => Ok(fresh),
            Err(e) => {
                error!(error = %e, "Failed to reload title cache, keeping stale data");
                Ok(snap)
            }
        }
    }

    /// Force a reload from the catalog.
    pub async fn reload(
        &self,
        catalog: &dyn MovieCatalog,
    ) -> Result<Arc<TitleSnapshot>, neo4rs::Error> {
        self.load(catalog).await
    }

    async fn load(&self, catalog: &dyn MovieCatalog) -> Result<Arc<TitleSnapshot>, neo4rs::Error> {
        let start = Instant::now();
        let titles = catalog.all_titles().await?;
        info!(
            titles = titles.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Title cache loaded"
        );
        let snap = Arc::new(TitleSnapshot {
            titles,
            loaded_at: Some(Instant::now()),
        });
        self.inner.store(Arc::clone(&snap));
        Ok(snap)
    }
}

/// Holds the `reloading` flag for the lifetime of one refresh. The flag is
/// released on drop, so a caller cancelled mid-reload does not wedge the cache.
struct ReloadGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ReloadGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ReloadGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Keyed result cache with a fixed time-to-live. Entries are dropped lazily:
/// an expired entry is reloaded on its next lookup, and expired entries are
/// swept whenever a new value is inserted.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, (Instant, V)>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries
            .get(key)
            .filter(|(at, _)| at.elapsed() < self.ttl)
            .map(|(_, v)| v.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let ttl = self.ttl;
        entries.retain(|_, (at, _)| at.elapsed() < ttl);
        entries.insert(key, (Instant::now(), value));
    }

    /// Return the cached value or run `load` and cache its result. Errors are
    /// not cached. The lock is not held while `load` runs, so concurrent
    /// misses on the same key may each load once.
    pub async fn get_or_try_load<F, Fut, E>(&self, key: K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }
        let value = load().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
