//! Keyed single-flight cache shared by the slide registry and the heatmap engine.
//!
//! The cache provides:
//! - Lookup of completed values under a shared read lock (unbounded policy)
//! - Singleflight pattern so at most one initializer runs per key, even when
//!   many tasks ask for the same key for the first time
//! - An injected eviction policy (unbounded or LRU)
//!
//! Failed initializations are shared with the tasks that waited on them but
//! are never stored, so the next request for the key starts over.
//!
//! Initializers run on detached tasks, so a caller that goes away (a dropped
//! HTTP request) never abandons or restarts work other callers wait on.
//!
//! # Example
//!
//! ```
//! use wsi_viewer::cache::{CachePolicy, SingleFlightCache};
//! use wsi_viewer::SlideError;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache: SingleFlightCache<String, SlideError> =
//!         SingleFlightCache::new(CachePolicy::Unbounded);
//!
//!     let value = cache
//!         .get_or_try_insert_with("slide.svs", || async { Ok("opened".to_string()) })
//!         .await
//!         .unwrap();
//!     assert_eq!(value.as_str(), "opened");
//!     assert_eq!(cache.len().await, 1);
//! }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};

// =============================================================================
// Eviction Policy
// =============================================================================

/// Eviction policy for a [`SingleFlightCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Keep every entry for the lifetime of the process.
    #[default]
    Unbounded,

    /// Keep at most `capacity` entries, evicting the least recently used.
    Lru { capacity: NonZeroUsize },
}

impl CachePolicy {
    /// LRU policy from a plain capacity, where 0 means unbounded.
    pub fn from_capacity(capacity: usize) -> Self {
        match NonZeroUsize::new(capacity) {
            Some(capacity) => CachePolicy::Lru { capacity },
            None => CachePolicy::Unbounded,
        }
    }
}

enum Entries<V> {
    Unbounded(HashMap<String, Arc<V>>),
    Lru(LruCache<String, Arc<V>>),
}

impl<V> Entries<V> {
    fn new(policy: CachePolicy) -> Self {
        match policy {
            CachePolicy::Unbounded => Entries::Unbounded(HashMap::new()),
            CachePolicy::Lru { capacity } => Entries::Lru(LruCache::new(capacity)),
        }
    }

    /// Lookup without touching recency.
    fn peek(&self, key: &str) -> Option<Arc<V>> {
        match self {
            Entries::Unbounded(map) => map.get(key).cloned(),
            Entries::Lru(lru) => lru.peek(key).cloned(),
        }
    }

    /// Lookup and mark as most recently used.
    fn touch(&mut self, key: &str) -> Option<Arc<V>> {
        match self {
            Entries::Unbounded(map) => map.get(key).cloned(),
            Entries::Lru(lru) => lru.get(key).cloned(),
        }
    }

    fn insert(&mut self, key: String, value: Arc<V>) {
        match self {
            Entries::Unbounded(map) => {
                map.insert(key, value);
            }
            Entries::Lru(lru) => {
                lru.put(key, value);
            }
        }
    }

    fn remove(&mut self, key: &str) {
        match self {
            Entries::Unbounded(map) => {
                map.remove(key);
            }
            Entries::Lru(lru) => {
                lru.pop(key);
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Entries::Unbounded(map) => map.len(),
            Entries::Lru(lru) => lru.len(),
        }
    }

    fn clear(&mut self) {
        match self {
            Entries::Unbounded(map) => map.clear(),
            Entries::Lru(lru) => lru.clear(),
        }
    }
}

/// Result of one initialization, `None` until the worker finishes.
type Flight<V, E> = watch::Receiver<Option<Result<Arc<V>, E>>>;

/// An initializer that finished without producing a result.
///
/// Raised when the worker task panics or the runtime shuts down under it.
/// Error types stored in a [`SingleFlightCache`] convert from this.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cache initializer aborted: {reason}")]
pub struct InitAborted {
    pub reason: String,
}

/// State shared with the detached initializer tasks.
struct Shared<V, E> {
    /// Completed values
    entries: RwLock<Entries<V>>,

    /// Initializations in progress, keyed like `entries`
    in_flight: Mutex<HashMap<String, Flight<V, E>>>,
}

// =============================================================================
// SingleFlightCache
// =============================================================================

/// Map from string keys to lazily created, immutable values.
///
/// Concurrent first-time requests for the same key run the initializer once;
/// requests for different keys never wait on each other's initializers.
///
/// The initializer runs on its own spawned task. Dropping a caller (for
/// example when an HTTP client disconnects) only stops that caller from
/// waiting: the initialization keeps going, its result is still published,
/// and the remaining waiters receive it.
pub struct SingleFlightCache<V, E> {
    policy: CachePolicy,
    shared: Arc<Shared<V, E>>,
}

impl<V, E> SingleFlightCache<V, E>
where
    V: Send + Sync + 'static,
    E: Clone + Send + Sync + From<InitAborted> + 'static,
{
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            shared: Arc::new(Shared {
                entries: RwLock::new(Entries::new(policy)),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Get a completed value if one is cached.
    pub async fn get(&self, key: &str) -> Option<Arc<V>> {
        match self.policy {
            // No recency bookkeeping, so readers share the lock
            CachePolicy::Unbounded => self.shared.entries.read().await.peek(key),
            CachePolicy::Lru { .. } => self.shared.entries.write().await.touch(key),
        }
    }

    /// Get the value for `key`, running `init` if it is not cached yet.
    ///
    /// If another task is already initializing the same key, this waits for
    /// that result instead of running `init` again. `init` is only called
    /// when this caller starts a new initialization.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: &str, init: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        // Fast path: already cached
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        // Slow path: join an in-flight initialization or start one
        let mut flight = {
            let mut in_flight = self.shared.in_flight.lock().await;

            // A worker may have published between the fast path and here
            if let Some(value) = self.get(key).await {
                return Ok(value);
            }

            match in_flight.get(key) {
                Some(flight) => flight.clone(),
                None => {
                    let (sender, flight) = watch::channel(None);
                    in_flight.insert(key.to_string(), flight.clone());
                    self.spawn_flight(key.to_string(), init(), sender);
                    flight
                }
            }
        };

        let result = match flight.wait_for(Option::is_some).await {
            Ok(result) => (*result).clone(),
            Err(_) => None,
        };
        result.unwrap_or_else(|| {
            Err(E::from(InitAborted {
                reason: format!("initializer for {key} exited without a result"),
            }))
        })
    }

    /// Run one initialization to completion, detached from every caller.
    fn spawn_flight<Fut>(
        &self,
        key: String,
        init: Fut,
        sender: watch::Sender<Option<Result<Arc<V>, E>>>,
    ) where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let result = match tokio::spawn(init).await {
                Ok(result) => result.map(Arc::new),
                Err(err) => Err(E::from(InitAborted {
                    reason: err.to_string(),
                })),
            };

            // Publish before retiring the flight so no request can miss both
            if let Ok(ref value) = result {
                shared
                    .entries
                    .write()
                    .await
                    .insert(key.clone(), Arc::clone(value));
            }
            shared.in_flight.lock().await.remove(&key);

            // Nobody may be waiting any more
            let _ = sender.send(Some(result));
        });
    }

    /// Remove a cached value.
    pub async fn invalidate(&self, key: &str) {
        self.shared.entries.write().await.remove(key);
    }

    /// Remove every cached value.
    pub async fn clear(&self) {
        self.shared.entries.write().await.clear();
    }

    /// Number of completed values currently cached.
    pub async fn len(&self) -> usize {
        self.shared.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// =============================================================================
// Tests
// =============================================================================
