//! Watchlist crawling, catalog resolution through a shared singleflight cache,
//! and windowed delivery of the resolved movies.

pub mod error;
pub mod retry;
pub mod crawler;
pub mod resolution_cache;
pub mod cache_storage;
pub mod disambiguation;
pub mod resolver;
pub mod window;
pub mod store;
pub mod identity;
pub mod progress;
pub mod selection;
pub mod delivery;

#[cfg(test)]
mod testing;

pub use error::{CrawlError, DeliveryError, IdentityError, ResolutionFailed, ResolveError, StoreError};
pub use retry::{RetryPolicy, Retryable};
pub use crawler::Crawler;
pub use resolution_cache::{CacheOrigin, CacheStats, ResolutionCache, ResolutionOutcome};
pub use cache_storage::ResolutionCacheStorage;
pub use resolver::MetadataResolver;
pub use window::{expand, initial_window, window_at, VisibleWindow, WindowCursor};
pub use store::{FileStore, PersistentStore, StoredWatchlist};
pub use identity::{CallerIdentity, IdentityProvider, LocalIdentityProvider};
pub use progress::{ProgressSummary, ProgressTracker};
pub use selection::{pick_by_title, pick_random};
pub use delivery::{EntryOutcome, EntryResolution, WatchlistService, WindowResolution, WindowSession};
