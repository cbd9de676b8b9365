use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::keys::{QueryKey, QueryNamespace};
use super::retry::{run_with_retry, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Idle,
    Pending,
    Success,
    Error,
}

/// Freshness and lifetime of one kind of entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Data younger than this is served without a fetch. `Duration::MAX` never goes stale.
    pub stale_time: Duration,
    /// Entries not read for this long are dropped by `collect_garbage`.
    pub gc_time: Duration,
}

impl QueryOptions {
    pub fn new(stale_time: Duration, gc_time: Duration) -> Self {
        Self { stale_time, gc_time }
    }
}

/// Read-only view of one entry.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<V, E> {
    pub status: QueryStatus,
    pub data: Option<V>,
    pub error: Option<E>,
    pub failure_count: u32,
    pub is_fetching: bool,
    pub invalidated: bool,
    pub updated_at: Option<Instant>,
}

impl<V, E> QuerySnapshot<V, E> {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            failure_count: 0,
            is_fetching: false,
            invalidated: false,
            updated_at: None,
        }
    }

    /// Pending with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.data.is_none()
    }

    pub fn is_stale(&self, stale_time: Duration) -> bool {
        match self.updated_at {
            Some(at) => self.invalidated || at.elapsed() >= stale_time,
            None => true,
        }
    }
}

struct CacheEntry<V, E> {
    status: QueryStatus,
    data: Option<V>,
    error: Option<E>,
    failure_count: u32,
    fetching: bool,
    invalidated: bool,
    updated_at: Option<Instant>,
    last_accessed: Instant,
    gc_time: Duration,
}

impl<V: Clone, E: Clone> CacheEntry<V, E> {
    fn new(gc_time: Duration) -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            failure_count: 0,
            fetching: false,
            invalidated: false,
            updated_at: None,
            last_accessed: Instant::now(),
            gc_time,
        }
    }

    fn fresh_data(&self, stale_time: Duration) -> Option<V> {
        if self.invalidated || self.status != QueryStatus::Success {
            return None;
        }
        let updated_at = self.updated_at?;
        if updated_at.elapsed() < stale_time {
            self.data.clone()
        } else {
            None
        }
    }

    fn snapshot(&self) -> QuerySnapshot<V, E> {
        QuerySnapshot {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            failure_count: self.failure_count,
            is_fetching: self.fetching,
            invalidated: self.invalidated,
            updated_at: self.updated_at,
        }
    }
}

type EntryMap<V, E> = Arc<RwLock<HashMap<QueryKey, CacheEntry<V, E>>>>;

// Marks an entry as no longer fetching if the fetch future is dropped before it stores an outcome.
struct InFlight<V: Send + Sync + 'static, E: Send + Sync + 'static> {
    entries: EntryMap<V, E>,
    key: Option<QueryKey>,
    prior_status: QueryStatus,
}

impl<V: Send + Sync + 'static, E: Send + Sync + 'static> InFlight<V, E> {
    fn complete(mut self) {
        self.key = None;
    }
}

impl<V: Send + Sync + 'static, E: Send + Sync + 'static> Drop for InFlight<V, E> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        let prior_status = self.prior_status;
        if let Ok(mut guard) = self.entries.try_write() {
            abandon(&mut guard, &key, prior_status);
            return;
        }

        let entries = self.entries.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let mut guard = entries.write().await;
                    abandon(&mut guard, &key, prior_status);
                });
            }
            Err(_) => tracing::warn!("query {} dropped mid-fetch outside a runtime", key),
        }
    }
}

fn abandon<V, E>(
    entries: &mut HashMap<QueryKey, CacheEntry<V, E>>,
    key: &QueryKey,
    prior_status: QueryStatus,
) {
    if let Some(entry) = entries.get_mut(key) {
        entry.fetching = false;
        entry.last_accessed = Instant::now();
        if entry.status == QueryStatus::Pending {
            entry.status = prior_status;
        }
        tracing::debug!("query {} abandoned mid-fetch", key);
    }
}

/// Shared keyed cache. Concurrent fetches of one key run the operation once.
pub struct QueryCache<V, E> {
    entries: EntryMap<V, E>,
    fetch_locks: RwLock<HashMap<QueryKey, Arc<Mutex<()>>>>,
}

impl<V, E> Default for QueryCache<V, E> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            fetch_locks: RwLock::new(HashMap::new()),
        }
    }
}

impl<V, E> QueryCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Display + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves fresh data, otherwise runs `op` under `policy` and stores the outcome.
    pub async fn fetch_with<P, F, Fut>(
        &self,
        key: &QueryKey,
        options: QueryOptions,
        policy: &P,
        op: F,
    ) -> Result<V, E>
    where
        P: RetryPolicy<E> + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(data) = self.cached(key, options).await {
            return Ok(data);
        }

        let fetch_lock = self.fetch_lock_for(key).await;
        let _guard = fetch_lock.lock().await;
        if let Some(data) = self.cached(key, options).await {
            return Ok(data);
        }

        self.run_locked(key, options, policy, op).await
    }

    /// Like `fetch_with` but ignores freshness. Still waits behind an in-flight fetch.
    pub async fn refetch_with<P, F, Fut>(
        &self,
        key: &QueryKey,
        options: QueryOptions,
        policy: &P,
        op: F,
    ) -> Result<V, E>
    where
        P: RetryPolicy<E> + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let fetch_lock = self.fetch_lock_for(key).await;
        let _guard = fetch_lock.lock().await;
        self.run_locked(key, options, policy, op).await
    }

    pub async fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot<V, E>> {
        let guard = self.entries.read().await;
        guard.get(key).map(CacheEntry::snapshot)
    }

    /// Marks the entry stale so the next read fetches again. Data stays visible.
    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        let mut guard = self.entries.write().await;
        match guard.get_mut(key) {
            Some(entry) => {
                entry.invalidated = true;
                tracing::debug!("invalidated query {}", key);
                true
            }
            None => false,
        }
    }

    pub async fn invalidate_namespace(&self, namespace: QueryNamespace) -> usize {
        let mut guard = self.entries.write().await;
        let mut count = 0;
        for (key, entry) in guard.iter_mut() {
            if key.namespace() == namespace {
                entry.invalidated = true;
                count += 1;
            }
        }
        tracing::debug!("invalidated {} entries in namespace {}", count, namespace.as_str());
        count
    }

    pub async fn remove(&self, key: &QueryKey) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        self.fetch_locks.write().await.remove(key);
        removed
    }

    /// Drops idle entries whose last read is older than their gc time.
    pub async fn collect_garbage(&self) -> usize {
        let removed = {
            let mut guard = self.entries.write().await;
            let before = guard.len();
            guard.retain(|_, entry| entry.fetching || entry.last_accessed.elapsed() < entry.gc_time);
            before - guard.len()
        };

        if removed > 0 {
            let entries = self.entries.read().await;
            let mut locks = self.fetch_locks.write().await;
            locks.retain(|key, lock| entries.contains_key(key) || Arc::strong_count(lock) > 1);
        }
        removed
    }

    /// Periodic garbage collection on the runtime. A zero interval disables it.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            return None;
        }
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.collect_garbage().await;
                if removed > 0 {
                    tracing::debug!("query cache sweep removed {} entries", removed);
                }
            }
        }))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    // Internal helper that returns fresh data and records the read.
    async fn cached(&self, key: &QueryKey, options: QueryOptions) -> Option<V> {
        let mut guard = self.entries.write().await;
        let entry = guard.get_mut(key)?;
        entry.last_accessed = Instant::now();
        entry.fresh_data(options.stale_time)
    }

    async fn run_locked<P, F, Fut>(
        &self,
        key: &QueryKey,
        options: QueryOptions,
        policy: &P,
        op: F,
    ) -> Result<V, E>
    where
        P: RetryPolicy<E> + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let in_flight = {
            let mut guard = self.entries.write().await;
            let entry = guard
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(options.gc_time));
            let prior_status = entry.status;
            entry.gc_time = options.gc_time;
            entry.fetching = true;
            entry.last_accessed = Instant::now();
            if entry.data.is_none() {
                entry.status = QueryStatus::Pending;
            }
            InFlight {
                entries: self.entries.clone(),
                key: Some(key.clone()),
                prior_status,
            }
        };

        let label = key.to_string();
        let outcome = run_with_retry(policy, &label, op).await;

        let mut guard = self.entries.write().await;
        let entry = guard
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(options.gc_time));
        entry.fetching = false;
        entry.last_accessed = Instant::now();
        match &outcome.result {
            Ok(data) => {
                entry.status = QueryStatus::Success;
                entry.data = Some(data.clone());
                entry.error = None;
                entry.failure_count = 0;
                entry.invalidated = false;
                entry.updated_at = Some(Instant::now());
            }
            Err(error) => {
                entry.status = QueryStatus::Error;
                entry.error = Some(error.clone());
                entry.failure_count = outcome.failure_count;
            }
        }
        drop(guard);
        in_flight.complete();
        outcome.result
    }

    async fn fetch_lock_for(&self, key: &QueryKey) -> Arc<Mutex<()>> {
        {
            let guard = self.fetch_locks.read().await;
            if let Some(lock) = guard.get(key) {
                return lock.clone();
            }
        }

        let mut guard = self.fetch_locks.write().await;
        if let Some(lock) = guard.get(key) {
            return lock.clone();
        }
        let lock = Arc::new(Mutex::new(()));
        guard.insert(key.clone(), lock.clone());
        lock
    }
}
