use crate::crawler::Crawler;
use crate::error::{DeliveryError, ResolveError};
use crate::identity::CallerIdentity;
use crate::progress::{ProgressSummary, ProgressTracker};
use crate::resolution_cache::{CacheOrigin, ResolutionCache};
use crate::resolver::MetadataResolver;
use crate::store::PersistentStore;
use crate::window::{expand, initial_window, window_at, VisibleWindow, WindowCursor};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use marquee_config::MAX_RESOLUTION_CONCURRENCY;
use marquee_models::{PinnedEntry, RawEntry, ResolutionKey, ResolvedMovie, SelectionLog, WatchlistSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

const PROGRESS_INTERVAL: usize = 20;

#[derive(Debug, Clone, PartialEq)]
/// How one entry fared in a window resolution
pub enum EntryOutcome {
    Resolved(Arc<ResolvedMovie>),
    /// Still resolving when the deadline passed; the result will land in the cache
    Pending,
    Failed(ResolveError),
}

/// The outcome for one visible or pinned entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntryResolution {
    pub entry: RawEntry,
    pub pinned: bool,
    pub outcome: EntryOutcome,
}

impl EntryResolution {
    pub fn movie(&self) -> Option<&Arc<ResolvedMovie>> {
        match &self.outcome {
            EntryOutcome::Resolved(movie) => Some(movie),
            _ => None,
        }
    }
}

/// Everything returned by one `resolve_visible` call
#[derive(Debug, Clone, PartialEq)]
pub struct WindowResolution {
    pub entries: Vec<EntryResolution>,
    pub summary: ProgressSummary,
}

impl WindowResolution {
    pub fn movies(&self) -> Vec<Arc<ResolvedMovie>> {
        self.entries.iter().filter_map(|r| r.movie().cloned()).collect()
    }
}

struct ResolutionRequest {
    entry: RawEntry,
    known_id: Option<u64>,
    pinned: bool,
}

/// The consumer-facing boundary: snapshots, windows and their resolution
pub struct WatchlistService {
    crawler: Crawler,
    resolver: Arc<MetadataResolver>,
    cache: ResolutionCache,
    store: Arc<dyn PersistentStore>,
    max_concurrency: usize,
    pending_deadline: Option<Duration>,
}

impl WatchlistService {
    /// Wire the crawler, resolver, shared cache and store together. Concurrency
    /// defaults to the maximum and there is no pending deadline.
    pub fn new(
        crawler: Crawler,
        resolver: Arc<MetadataResolver>,
        cache: ResolutionCache,
        store: Arc<dyn PersistentStore>,
    ) -> Self {
        Self {
            crawler,
            resolver,
            cache,
            store,
            max_concurrency: MAX_RESOLUTION_CONCURRENCY,
            pending_deadline: None,
        }
    }

    /// Entries resolved at once per window, clamped to 1..=8
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.clamp(1, MAX_RESOLUTION_CONCURRENCY);
        self
    }

    /// Report entries still resolving after `deadline` as pending instead of waiting
    pub fn with_pending_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.pending_deadline = deadline;
        self
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// The caller's stored snapshot for `username`, crawling when there is
    /// none, it is incomplete, or `refresh` is set. A successful crawl
    /// replaces the stored copy; a failed one leaves it untouched.
    pub async fn get_snapshot(
        &self,
        identity: &CallerIdentity,
        username: &str,
        refresh: bool,
    ) -> Result<WatchlistSnapshot, DeliveryError> {
        if !refresh {
            if let Some(stored) = self.store.get_watchlist(identity)? {
                if stored.snapshot.exhausted && stored.snapshot.username.eq_ignore_ascii_case(username) {
                    info!(
                        "Using stored watchlist for '{}' ({} entries, stored {})",
                        username,
                        stored.snapshot.len(),
                        stored.stored_at.format("%Y-%m-%d %H:%M")
                    );
                    return Ok(stored.snapshot);
                }
            }
        }

        let snapshot = self.crawler.crawl(username).await?;
        self.store.upsert_watchlist(identity, &snapshot)?;
        Ok(snapshot)
    }

    /// The window a consumer had revealed, rebuilt from its cursor
    pub fn get_window(&self, snapshot: &WatchlistSnapshot, cursor: WindowCursor) -> VisibleWindow {
        window_at(snapshot, cursor)
    }

    /// Resolve every visible entry plus the pins, in window order followed by
    /// pins. Failures are reported per entry and never stop the others.
    pub async fn resolve_visible(&self, window: &VisibleWindow, pins: &[PinnedEntry]) -> WindowResolution {
        let requests = merge_requests(window, pins);
        let mut tracker = ProgressTracker::new(requests.len(), PROGRESS_INTERVAL);
        let mut entries = Vec::with_capacity(requests.len());

        let mut resolutions = stream::iter(requests)
            .map(|request| self.resolve_one(request))
            .buffered(self.max_concurrency);

        while let Some((resolution, origin)) = resolutions.next().await {
            match (&resolution.outcome, origin) {
                (EntryOutcome::Pending, _) => tracker.record_pending(),
                (EntryOutcome::Failed(reason), _) => tracker.record_failed(reason.category()),
                (EntryOutcome::Resolved(_), Some(CacheOrigin::Hit)) => tracker.record_cached(),
                (EntryOutcome::Resolved(_), _) => tracker.record_resolved(),
            }
            entries.push(resolution);
            tracker.log_progress(entries.len());
        }

        tracker.log_summary("Window resolution");
        WindowResolution {
            entries,
            summary: tracker.summary(),
        }
    }

    async fn resolve_one(&self, request: ResolutionRequest) -> (EntryResolution, Option<CacheOrigin>) {
        let lookup = self
            .resolver
            .resolve_cached(&self.cache, &request.entry, request.known_id);
        let finished = match self.pending_deadline {
            // Dropping the waiter leaves the resolution itself running
            Some(deadline) => tokio::time::timeout(deadline, lookup).await.ok(),
            None => Some(lookup.await),
        };

        let (outcome, origin) = match finished {
            Some((Ok(movie), origin)) => (EntryOutcome::Resolved(movie), Some(origin)),
            Some((Err(failed), origin)) => {
                warn!("Could not resolve '{}': {}", request.entry, failed.reason);
                (EntryOutcome::Failed(failed.reason), Some(origin))
            }
            None => {
                debug!("'{}' still resolving, reporting as pending", request.entry);
                (EntryOutcome::Pending, None)
            }
        };

        (
            EntryResolution {
                entry: request.entry,
                pinned: request.pinned,
                outcome,
            },
            origin,
        )
    }

    /// Append a selection log of `picks` for the caller
    pub fn record_selection(
        &self,
        identity: &CallerIdentity,
        username: &str,
        picks: Vec<ResolvedMovie>,
    ) -> Result<SelectionLog, DeliveryError> {
        let log = SelectionLog {
            identity: identity.to_string(),
            username: username.to_string(),
            picks,
            selected_at: Utc::now(),
        };
        self.store.append_selection(identity, &log)?;
        info!("Recorded {} pick(s) from '{}'", log.picks.len(), username);
        Ok(log)
    }

    /// Selection logs for the caller, newest first
    pub fn selection_history(&self, identity: &CallerIdentity) -> Result<Vec<SelectionLog>, DeliveryError> {
        Ok(self.store.selections(identity)?)
    }
}

/// Window entries first, then pins that are not already visible. A pin
/// without a known id that matches a visible title marks that entry instead.
fn merge_requests(window: &VisibleWindow, pins: &[PinnedEntry]) -> Vec<ResolutionRequest> {
    let mut requests: Vec<ResolutionRequest> = window
        .entries()
        .iter()
        .map(|entry| ResolutionRequest {
            entry: entry.clone(),
            known_id: None,
            pinned: false,
        })
        .collect();
    let visible = requests.len();

    for pin in pins {
        let key = ResolutionKey::for_entry(&pin.entry, pin.catalog_id);
        if let Some(existing) = requests
            .iter_mut()
            .find(|r| ResolutionKey::for_entry(&r.entry, r.known_id) == key)
        {
            existing.pinned = true;
            continue;
        }
        requests.push(ResolutionRequest {
            entry: pin.entry.clone(),
            known_id: pin.catalog_id,
            pinned: true,
        });
    }

    debug!(
        "Resolving {} visible and {} extra pinned entries",
        visible,
        requests.len() - visible
    );
    requests
}

/// One consumer's view of a snapshot: its growing window and pinned picks.
///
/// `reveal_more` is the visibility signal. While one reveal is still
/// resolving, further signals are ignored rather than queued.
pub struct WindowSession {
    snapshot: WatchlistSnapshot,
    window_size: usize,
    window: Mutex<VisibleWindow>,
    pins: Mutex<Vec<PinnedEntry>>,
    revealing: AtomicBool,
}

struct RevealGuard<'a>(&'a AtomicBool);

impl Drop for RevealGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl WindowSession {
    /// Start with the first `window_size` entries visible and nothing pinned
    pub fn new(snapshot: WatchlistSnapshot, window_size: usize) -> Self {
        let window = initial_window(&snapshot, window_size);
        Self::with_window(snapshot, window_size, window)
    }

    /// Pick up where a consumer left off
    pub fn resume(snapshot: WatchlistSnapshot, window_size: usize, cursor: WindowCursor) -> Self {
        let window = window_at(&snapshot, cursor);
        Self::with_window(snapshot, window_size, window)
    }

    fn with_window(snapshot: WatchlistSnapshot, window_size: usize, window: VisibleWindow) -> Self {
        Self {
            snapshot,
            window_size,
            window: Mutex::new(window),
            pins: Mutex::new(Vec::new()),
            revealing: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> &WatchlistSnapshot {
        &self.snapshot
    }

    pub fn window(&self) -> VisibleWindow {
        self.window.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Returns false when an equal pin already exists
    pub fn pin(&self, pin: PinnedEntry) -> bool {
        let mut pins = self.pins.lock().unwrap_or_else(|p| p.into_inner());
        if pins.contains(&pin) {
            return false;
        }
        pins.push(pin);
        true
    }

    pub fn unpin(&self, entry: &RawEntry) -> bool {
        let mut pins = self.pins.lock().unwrap_or_else(|p| p.into_inner());
        let before = pins.len();
        pins.retain(|pin| pin.entry != *entry);
        pins.len() != before
    }

    pub fn pins(&self) -> Vec<PinnedEntry> {
        self.pins.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Resolve the current window and pins without revealing anything new
    pub async fn resolve(&self, service: &WatchlistService) -> WindowResolution {
        service.resolve_visible(&self.window(), &self.pins()).await
    }

    /// Reveal the next window-size entries and resolve the grown window.
    /// `None` when another reveal is still in flight.
    pub async fn reveal_more(&self, service: &WatchlistService) -> Option<WindowResolution> {
        if self.revealing.swap(true, Ordering::AcqRel) {
            debug!("Reveal already in flight, ignoring signal");
            return None;
        }
        let _guard = RevealGuard(&self.revealing);

        let window = {
            let mut current = self.window.lock().unwrap_or_else(|p| p.into_inner());
            let grown = expand(current.clone(), &self.snapshot, self.window_size);
            *current = grown.clone();
            grown
        };
        debug!("Window now shows {}/{} entries", window.len(), self.snapshot.len());

        Some(service.resolve_visible(&window, &self.pins()).await)
    }
}
