use crate::error::{ResolutionFailed, ResolveError};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{FuturesUnordered, StreamExt};
use marquee_models::{ResolutionKey, ResolvedMovie};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace};

pub type ResolutionOutcome = Result<Arc<ResolvedMovie>, ResolutionFailed>;

type SharedResolution = Shared<BoxFuture<'static, ResolutionOutcome>>;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_FAILURE_COOLDOWN: Duration = Duration::from_secs(120);

/// Expired slots are swept once every this many new resolutions
const PURGE_INTERVAL: u64 = 64;

enum Slot {
    Pending {
        generation: u64,
        resolution: SharedResolution,
    },
    Resolved {
        movie: Arc<ResolvedMovie>,
        at: Instant,
    },
    Failed {
        reason: ResolveError,
        at: Instant,
    },
}

/// Where a returned outcome came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOrigin {
    /// Unexpired success already in the cache
    Hit,
    /// Failure still inside its cool-down; the resolver was not called
    CoolingDown,
    /// Joined a resolution another caller had already started
    Joined,
    /// This call started the resolution
    Resolved,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Counters since the cache was created; `misses` counts resolver invocations
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub cooled_down: u64,
    pub entries: usize,
}

enum Lookup {
    Ready(ResolutionOutcome, CacheOrigin),
    Join(SharedResolution),
    Start,
}

struct CacheInner {
    slots: Mutex<HashMap<ResolutionKey, Slot>>,
    ttl: Duration,
    failure_cooldown: Duration,
    next_generation: AtomicU64,
    started: AtomicU64,
    hits: AtomicU64,
    coalesced: AtomicU64,
    cooled_down: AtomicU64,
}

/// Process-wide singleflight cache of catalog resolutions.
///
/// Cloning is cheap and every clone shares the same slots. At most one
/// resolution per key is in flight; later callers for that key await the
/// same shared outcome. Resolutions run as detached tasks so that a caller
/// giving up never cancels the work, and the result still lands in the cache.
#[derive(Clone)]
pub struct ResolutionCache {
    inner: Arc<CacheInner>,
}

impl ResolutionCache {
    /// Successes are served for `ttl`; failures are returned as-is for
    /// `failure_cooldown` before the key may be resolved again.
    pub fn new(ttl: Duration, failure_cooldown: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                slots: Mutex::new(HashMap::new()),
                ttl,
                failure_cooldown,
                next_generation: AtomicU64::new(0),
                started: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
                cooled_down: AtomicU64::new(0),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Return the cached outcome for `key`, join a resolution already in flight,
    /// or start one with `resolve`. `resolve` is only called when starting.
    pub async fn get_or_resolve<F, Fut>(&self, key: ResolutionKey, resolve: F) -> ResolutionOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResolvedMovie, ResolveError>> + Send + 'static,
    {
        self.get_or_resolve_traced(key, resolve).await.0
    }

    /// Like [`get_or_resolve`](Self::get_or_resolve), also reporting how the
    /// outcome was obtained
    pub async fn get_or_resolve_traced<F, Fut>(
        &self,
        key: ResolutionKey,
        resolve: F,
    ) -> (ResolutionOutcome, CacheOrigin)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResolvedMovie, ResolveError>> + Send + 'static,
    {
        let (resolution, origin) = {
            let mut slots = self.inner.lock();
            let now = Instant::now();

            match self.inner.lookup(&slots, &key, now) {
                Lookup::Ready(outcome, origin) => return (outcome, origin),
                Lookup::Join(resolution) => {
                    trace!("Joining in-flight resolution of {}", key);
                    self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                    (resolution, CacheOrigin::Joined)
                }
                Lookup::Start => {
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                    let resolution = self.spawn_resolution(key.clone(), generation, resolve());
                    debug!("Resolving {} (generation {})", key, generation);
                    slots.insert(
                        key,
                        Slot::Pending {
                            generation,
                            resolution: resolution.clone(),
                        },
                    );

                    let started = self.inner.started.fetch_add(1, Ordering::Relaxed) + 1;
                    if started % PURGE_INTERVAL == 0 {
                        self.inner.purge_expired(&mut slots, now);
                    }
                    (resolution, CacheOrigin::Resolved)
                }
            }
        };

        (resolution.await, origin)
    }

    fn spawn_resolution<Fut>(&self, key: ResolutionKey, generation: u64, work: Fut) -> SharedResolution
    where
        Fut: Future<Output = Result<ResolvedMovie, ResolveError>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(ResolveError::Upstream("resolver panicked".to_string())),
            };
            inner.complete(key, generation, result)
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(ResolutionFailed::new(ResolveError::Upstream(format!(
                    "resolution task did not finish: {}",
                    e
                ))))
            })
        }
        .boxed()
        .shared()
    }

    /// Wait for the resolutions in flight right now to land in the cache,
    /// giving up after `limit`. Returns how many were still running.
    ///
    /// Spawned resolutions die with the runtime, so a short-lived process
    /// calls this before exporting the cache.
    pub async fn settle(&self, limit: Duration) -> usize {
        let mut in_flight: FuturesUnordered<SharedResolution> = self
            .inner
            .lock()
            .values()
            .filter_map(|slot| match slot {
                Slot::Pending { resolution, .. } => Some(resolution.clone()),
                _ => None,
            })
            .collect();
        if in_flight.is_empty() {
            return 0;
        }

        info!("Waiting for {} resolution(s) still in flight", in_flight.len());
        let deadline = tokio::time::sleep(limit);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                next = in_flight.next() => {
                    if next.is_none() {
                        break;
                    }
                }
                _ = &mut deadline => break,
            }
        }

        let remaining = in_flight.len();
        if remaining > 0 {
            debug!("{} resolution(s) still running after {:?}", remaining, limit);
        }
        remaining
    }

    /// Drop every slot. Resolutions still in flight finish but are not stored.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.inner.lock().len();
        let started = self.inner.started.load(Ordering::Relaxed);
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: started,
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
            cooled_down: self.inner.cooled_down.load(Ordering::Relaxed),
            entries,
        }
    }

    /// Unexpired successes, for persisting across processes
    pub fn export_fresh(&self) -> Vec<(ResolutionKey, ResolvedMovie)> {
        let now = Instant::now();
        let slots = self.inner.lock();
        slots
            .iter()
            .filter_map(|(key, slot)| match slot {
                Slot::Resolved { movie, at } if now.duration_since(*at) < self.inner.ttl => {
                    Some((key.clone(), movie.as_ref().clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Seed the cache with previously exported successes.
    ///
    /// Age is measured from each movie's `resolved_at`, so a warmed entry
    /// expires when the original resolution would have. Keys already present
    /// are left alone. Returns how many entries were loaded.
    pub fn warm(&self, entries: Vec<(ResolutionKey, ResolvedMovie)>) -> usize {
        let now = Instant::now();
        let wall_now = Utc::now();
        let mut slots = self.inner.lock();
        let mut loaded = 0;

        for (key, movie) in entries {
            let age = (wall_now - movie.resolved_at)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if age >= self.inner.ttl || slots.contains_key(&key) {
                continue;
            }
            let at = now.checked_sub(age).unwrap_or(now);
            slots.insert(key, Slot::Resolved { movie: Arc::new(movie), at });
            loaded += 1;
        }

        debug!("Warmed resolution cache with {} entries", loaded);
        loaded
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_FAILURE_COOLDOWN)
    }
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<ResolutionKey, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup(&self, slots: &HashMap<ResolutionKey, Slot>, key: &ResolutionKey, now: Instant) -> Lookup {
        match slots.get(key) {
            Some(Slot::Pending { resolution, .. }) => Lookup::Join(resolution.clone()),
            Some(Slot::Resolved { movie, at }) if now.duration_since(*at) < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Lookup::Ready(Ok(Arc::clone(movie)), CacheOrigin::Hit)
            }
            Some(Slot::Failed { reason, at }) if now.duration_since(*at) < self.failure_cooldown => {
                self.cooled_down.fetch_add(1, Ordering::Relaxed);
                Lookup::Ready(
                    Err(ResolutionFailed::new(reason.clone())),
                    CacheOrigin::CoolingDown,
                )
            }
            _ => Lookup::Start,
        }
    }

    fn is_live(&self, slot: &Slot, now: Instant) -> bool {
        match slot {
            Slot::Pending { .. } => true,
            Slot::Resolved { at, .. } => now.duration_since(*at) < self.ttl,
            Slot::Failed { at, .. } => now.duration_since(*at) < self.failure_cooldown,
        }
    }

    /// Pending -> Resolved/Failed, in one critical section. A slot replaced
    /// since this resolution started (by `clear`) is left untouched.
    fn complete(
        &self,
        key: ResolutionKey,
        generation: u64,
        result: Result<ResolvedMovie, ResolveError>,
    ) -> ResolutionOutcome {
        let now = Instant::now();
        let mut slots = self.lock();
        let current = matches!(
            slots.get(&key),
            Some(Slot::Pending { generation: g, .. }) if *g == generation
        );

        match result {
            Ok(movie) => {
                let movie = Arc::new(movie);
                if current {
                    // A title resolution also answers later lookups by its id
                    let id_key = ResolutionKey::CatalogId(movie.id);
                    if id_key != key && !slots.get(&id_key).is_some_and(|slot| self.is_live(slot, now)) {
                        slots.insert(id_key, Slot::Resolved { movie: Arc::clone(&movie), at: now });
                    }
                    slots.insert(key, Slot::Resolved { movie: Arc::clone(&movie), at: now });
                }
                Ok(movie)
            }
            Err(reason) => {
                debug!("Resolution of {} failed: {}", key, reason);
                if current {
                    slots.insert(key, Slot::Failed { reason: reason.clone(), at: now });
                }
                Err(ResolutionFailed::new(reason))
            }
        }
    }

    fn purge_expired(&self, slots: &mut HashMap<ResolutionKey, Slot>, now: Instant) {
        let before = slots.len();
        slots.retain(|_, slot| self.is_live(slot, now));
        let purged = before - slots.len();
        if purged > 0 {
            debug!("Purged {} expired resolution cache entries", purged);
        }
    }
}
