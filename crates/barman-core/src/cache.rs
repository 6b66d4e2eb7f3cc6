//! Single-slot cache for the server list.
//!
//! Listing servers is the most expensive call the console makes and its
//! result feeds the navigation menu of every page, so it is fetched once and
//! kept until an operator asks for a refresh.
//!
//! # States
//!
//! ```text
//!            get()                 fetch ok
//!   Empty ──────────▶ Loading ─────────────▶ Populated
//!     ▲                  │                       │
//!     │    fetch failed  │                       │
//!     ├──────────────────┘                       │
//!     │              invalidate()                │
//!     └──────────────────────────────────────────┘
//! ```
//!
//! While `Loading`, further `get()` calls join the in-flight fetch instead of
//! spawning another process, and all of them observe the same outcome. A
//! failed fetch is never stored. `invalidate()` during `Loading` wins: the
//! fetch still completes for its waiters but its result is discarded.

use crate::error::Result;
use crate::operation::Operation;
use crate::runner::CommandRunner;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Fetch = Shared<BoxFuture<'static, Result<Arc<Value>>>>;

const NO_IDS: &[&str] = &[];

enum Slot {
    Empty,
    Loading { generation: u64, fetch: Fetch },
    Populated(Arc<Value>),
}

struct State {
    slot: Slot,
    /// Incremented for every fetch so a stale fetch can't overwrite the slot.
    generation: u64,
}

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// `get()` calls answered from the slot.
    pub hits: AtomicU64,
    /// `get()` calls that started or joined a fetch.
    pub misses: AtomicU64,
    /// Fetches started (one process each).
    pub fetches: AtomicU64,
    /// `invalidate()` calls.
    pub invalidations: AtomicU64,
}

impl CacheStats {
    /// Get the number of hits.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get the number of misses.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get the number of fetches started.
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Get the number of invalidations.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }
}

/// Memoized result of the list-servers operation.
pub struct ServerListCache {
    runner: CommandRunner,
    state: Mutex<State>,
    stats: CacheStats,
}

impl ServerListCache {
    /// Create an empty cache backed by `runner`.
    pub fn new(runner: CommandRunner) -> Self {
        Self {
            runner,
            state: Mutex::new(State {
                slot: Slot::Empty,
                generation: 0,
            }),
            stats: CacheStats::default(),
        }
    }

    /// Return the server list, fetching it if the slot is empty.
    ///
    /// A hit never spawns a process. Concurrent misses share one fetch.
    ///
    /// # Errors
    ///
    /// Returns the fetch's error unchanged; the slot stays empty.
    pub async fn get(&self) -> Result<Arc<Value>> {
        let (generation, fetch) = {
            let mut state = self.lock();
            match &state.slot {
                Slot::Populated(value) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!("Server list cache hit");
                    return Ok(Arc::clone(value));
                }
                Slot::Loading { generation, fetch } => {
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(generation, "Joining in-flight server list fetch");
                    (*generation, fetch.clone())
                }
                Slot::Empty => {
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    self.stats.fetches.fetch_add(1, Ordering::Relaxed);
                    state.generation += 1;
                    let generation = state.generation;
                    tracing::debug!(generation, "Server list cache miss, fetching");

                    let runner = self.runner.clone();
                    let fetch = async move {
                        runner
                            .run(Operation::ListServers, NO_IDS)
                            .await
                            .map(Arc::new)
                    }
                    .boxed()
                    .shared();

                    state.slot = Slot::Loading {
                        generation,
                        fetch: fetch.clone(),
                    };
                    (generation, fetch)
                }
            }
        };

        let result = fetch.await;
        self.settle(generation, &result);
        result
    }

    /// Return the cached list without fetching.
    pub fn peek(&self) -> Option<Arc<Value>> {
        match &self.lock().slot {
            Slot::Populated(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Whether the slot currently holds a value.
    pub fn is_populated(&self) -> bool {
        matches!(self.lock().slot, Slot::Populated(_))
    }

    /// Clear the slot. The next `get()` fetches again.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
        if !matches!(state.slot, Slot::Empty) {
            tracing::info!("Server list cache invalidated");
        }
        state.slot = Slot::Empty;
    }

    /// Get the cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Store the outcome of fetch `generation` if it is still the current one.
    ///
    /// Every waiter calls this, so the slot settles even if the caller that
    /// started the fetch was dropped.
    fn settle(&self, generation: u64, result: &Result<Arc<Value>>) {
        let mut state = self.lock();
        let current = matches!(
            state.slot,
            Slot::Loading { generation: g, .. } if g == generation
        );
        if !current {
            return;
        }

        state.slot = match result {
            Ok(value) => {
                tracing::debug!(generation, "Server list cached");
                Slot::Populated(Arc::clone(value))
            }
            Err(e) => {
                tracing::warn!(generation, error = %e, "Server list fetch failed, not caching");
                Slot::Empty
            }
        };
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // The slot is only ever replaced whole, so a poisoned lock is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ServerListCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.lock().slot {
            Slot::Empty => "empty",
            Slot::Loading { .. } => "loading",
            Slot::Populated(_) => "populated",
        };
        f.debug_struct("ServerListCache")
            .field("state", &state)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use crate::error::CoreError;
    use crate::test_support::{FakeResponse, FakeSpawner};
    use serde_json::json;
    use std::time::Duration;

    fn servers() -> Value {
        json!({"main": {"description": "Main PostgreSQL"}, "replica": {"description": "Replica"}})
    }

    fn cache_with(spawner: &Arc<FakeSpawner>) -> ServerListCache {
        ServerListCache::new(CommandRunner::with_spawner(
            RunnerConfig::new("barman"),
            spawner.clone(),
        ))
    }

    fn spawn_failure() -> FakeResponse {
        FakeResponse::SpawnError("permission denied".into())
    }

    #[tokio::test]
    async fn test_second_get_is_a_hit() {
        let spawner = Arc::new(FakeSpawner::new(servers()));
        let cache = cache_with(&spawner);

        let first = cache.get().await.unwrap();
        let second = cache.get().await.unwrap();

        assert_eq!(*first, servers());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(spawner.call_count(), 1);
        assert_eq!(
            spawner.calls()[0],
            vec!["barman", "-f", "json", "list-server"]
        );
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().fetches(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_one_fresh_fetch() {
        let spawner = Arc::new(FakeSpawner::new(servers()));
        let cache = cache_with(&spawner);

        cache.get().await.unwrap();
        cache.invalidate();
        assert!(!cache.is_populated());

        cache.get().await.unwrap();
        assert_eq!(spawner.call_count(), 2);

        cache.get().await.unwrap();
        assert_eq!(spawner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_on_empty_is_noop() {
        let spawner = Arc::new(FakeSpawner::new(servers()));
        let cache = cache_with(&spawner);

        cache.invalidate();
        cache.invalidate();
        assert!(!cache.is_populated());
        assert_eq!(spawner.call_count(), 0);

        cache.get().await.unwrap();
        assert_eq!(spawner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let spawner = Arc::new(FakeSpawner::new(servers()));
        spawner.push(spawn_failure());
        let cache = cache_with(&spawner);

        let err = cache.get().await.unwrap_err();
        assert!(matches!(err, CoreError::Execution { .. }));
        assert!(!cache.is_populated());
        assert!(cache.peek().is_none());

        let value = cache.get().await.unwrap();
        assert_eq!(*value, servers());
        assert_eq!(spawner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_parse_failure_is_not_cached() {
        let spawner = Arc::new(FakeSpawner::new(servers()));
        spawner.push(FakeResponse::Exit {
            code: Some(0),
            stdout: b"<html>".to_vec(),
            stderr: Vec::new(),
        });
        let cache = cache_with(&spawner);

        assert_eq!(cache.get().await.unwrap_err().kind(), "parse_error");
        assert!(cache.get().await.is_ok());
        assert_eq!(spawner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_peek_does_not_fetch() {
        let spawner = Arc::new(FakeSpawner::new(servers()));
        let cache = cache_with(&spawner);

        assert!(cache.peek().is_none());
        assert_eq!(spawner.call_count(), 0);

        cache.get().await.unwrap();
        assert_eq!(cache.peek().as_deref(), Some(&servers()));
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let spawner =
            Arc::new(FakeSpawner::new(servers()).with_delay(Duration::from_millis(20)));
        let cache = cache_with(&spawner);

        let results = futures::future::join_all((0..16).map(|_| cache.get())).await;

        assert_eq!(spawner.call_count(), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
        }
        assert!(cache.is_populated());
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_failure() {
        let spawner =
            Arc::new(FakeSpawner::new(servers()).with_delay(Duration::from_millis(20)));
        spawner.push(spawn_failure());
        let cache = cache_with(&spawner);

        let results = futures::future::join_all((0..8).map(|_| cache.get())).await;

        assert_eq!(spawner.call_count(), 1);
        let first = results[0].as_ref().unwrap_err();
        for result in &results {
            assert_eq!(result.as_ref().unwrap_err(), first);
        }
        assert!(!cache.is_populated());

        cache.get().await.unwrap();
        assert_eq!(spawner.call_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_across_tasks() {
        let spawner =
            Arc::new(FakeSpawner::new(servers()).with_delay(Duration::from_millis(200)));
        let cache = Arc::new(cache_with(&spawner));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get().await })
            })
            .collect();

        for handle in handles {
            let value = handle.await.unwrap().unwrap();
            assert_eq!(*value, servers());
        }
        assert_eq!(spawner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_during_fetch_wins() {
        let spawner =
            Arc::new(FakeSpawner::new(servers()).with_delay(Duration::from_millis(20)));
        let cache = cache_with(&spawner);

        let (value, ()) = tokio::join!(cache.get(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            cache.invalidate();
        });

        // The waiter still gets the value, but it is not stored
        assert_eq!(*value.unwrap(), servers());
        assert!(!cache.is_populated());

        cache.get().await.unwrap();
        assert_eq!(spawner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_dropped_leader_still_settles() {
        let spawner =
            Arc::new(FakeSpawner::new(servers()).with_delay(Duration::from_millis(20)));
        let cache = cache_with(&spawner);

        // Start a fetch and abandon it after the first poll
        let mut leader = Box::pin(cache.get());
        assert!(futures::poll!(leader.as_mut()).is_pending());
        drop(leader);

        // The follower picks up the same in-flight fetch
        cache.get().await.unwrap();
        assert!(cache.is_populated());
        assert_eq!(spawner.call_count(), 1);
    }
}
