use crate::error::CrawlError;
use crate::retry::RetryPolicy;
use marquee_config::{ListingConfig, RetrySettings};
use marquee_models::WatchlistSnapshot;
use marquee_sources::ListingSource;
use std::sync::Arc;
use tracing::{debug, error, info};

const DEFAULT_PAGE_CEILING: u32 = 500;

/// Walks a paginated listing from page 1 until it runs dry.
///
/// Pages are fetched strictly in order, one at a time. The crawl ends on the
/// first page that parses to zero entries, or on a non-empty page shorter than
/// the page-size hint when one is configured. Any page failing after retries
/// fails the whole crawl; no partial snapshot is ever returned.
pub struct Crawler {
    source: Arc<dyn ListingSource>,
    retry: RetryPolicy,
    page_ceiling: u32,
    page_size_hint: usize,
}

impl Crawler {
    /// Crawl `source` with the default page ceiling and no page-size hint
    pub fn new(source: Arc<dyn ListingSource>, retry: RetryPolicy) -> Self {
        Self {
            source,
            retry,
            page_ceiling: DEFAULT_PAGE_CEILING,
            page_size_hint: 0,
        }
    }

    /// Build a crawler from the `[listing]` and `[retry.listing]` settings
    pub fn from_config(
        source: Arc<dyn ListingSource>,
        listing: &ListingConfig,
        retry: &RetrySettings,
    ) -> Self {
        Self::new(source, RetryPolicy::from_settings(retry))
            .with_page_ceiling(listing.page_ceiling)
            .with_page_size_hint(listing.page_size)
    }

    /// Maximum pages fetched before giving up with `LimitExceeded` (at least 1)
    pub fn with_page_ceiling(mut self, ceiling: u32) -> Self {
        self.page_ceiling = ceiling.max(1);
        self
    }

    /// Zero disables the hint
    pub fn with_page_size_hint(mut self, page_size: usize) -> Self {
        self.page_size_hint = page_size;
        self
    }

    /// Fetch every page of `username`'s listing, in order, one at a time.
    ///
    /// Returns an exhausted snapshot, or an error if any page fails after retries
    /// or the ceiling is reached first.
    pub async fn crawl(&self, username: &str) -> Result<WatchlistSnapshot, CrawlError> {
        info!(
            "Crawling {} listing for '{}'",
            self.source.source_name(),
            username
        );
        let mut snapshot = WatchlistSnapshot::new(username);

        for page in 1..=self.page_ceiling {
            let label = format!("fetch of page {} for '{}'", page, username);
            let markup = self
                .retry
                .run(&label, || self.source.fetch_page(username, page))
                .await
                .map_err(|source| CrawlError::Fetch {
                    username: username.to_string(),
                    page,
                    source,
                })?;

            snapshot.pages_fetched = page;
            let entries = self.source.parse_page(&markup);
            let count = entries.len();
            debug!("Page {} yielded {} entries", page, count);

            if count == 0 {
                return Ok(self.finish(snapshot));
            }

            snapshot.entries.extend(entries);

            if self.page_size_hint > 0 && count < self.page_size_hint {
                debug!(
                    "Page {} was short ({} < {}), treating it as the last page",
                    page, count, self.page_size_hint
                );
                return Ok(self.finish(snapshot));
            }
        }

        error!(
            "Listing for '{}' still returned entries at page {}; the listing format may have changed",
            username, self.page_ceiling
        );
        Err(CrawlError::LimitExceeded {
            username: username.to_string(),
            ceiling: self.page_ceiling,
        })
    }

    fn finish(&self, mut snapshot: WatchlistSnapshot) -> WatchlistSnapshot {
        snapshot.mark_exhausted();
        info!(
            "Crawl complete for '{}': {} entries over {} page(s)",
            snapshot.username,
            snapshot.len(),
            snapshot.pages_fetched
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{entries, http_status, FakeListing};
    use std::time::Duration;

    fn crawler(listing: &Arc<FakeListing>) -> Crawler {
        Crawler::new(
            listing.clone(),
            RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(20)),
        )
    }

    #[tokio::test]
    async fn test_short_last_page_ends_crawl() {
        let listing = Arc::new(FakeListing::paged(entries(45), 20));
        let snapshot = crawler(&listing)
            .with_page_size_hint(20)
            .crawl("cinephile")
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 45);
        assert!(snapshot.exhausted);
        assert_eq!(snapshot.pages_fetched, 3);
        assert_eq!(listing.fetches(), 3);
        assert_eq!(snapshot.entries[0].title, "Movie 1");
        assert_eq!(snapshot.entries[44].title, "Movie 45");
    }

    #[tokio::test]
    async fn test_without_hint_empty_page_ends_crawl() {
        let listing = Arc::new(FakeListing::paged(entries(45), 20));
        let snapshot = crawler(&listing).crawl("cinephile").await.unwrap();

        assert_eq!(snapshot.len(), 45);
        assert_eq!(listing.fetches(), 4);
        assert!(snapshot.exhausted);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_trailing_empty_page() {
        let listing = Arc::new(FakeListing::paged(entries(40), 20));
        let snapshot = crawler(&listing)
            .with_page_size_hint(20)
            .crawl("cinephile")
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 40);
        assert_eq!(listing.fetches(), 3);
    }

    #[tokio::test]
    async fn test_empty_first_page_is_an_empty_watchlist() {
        let listing = Arc::new(FakeListing::new(vec![]));
        let snapshot = crawler(&listing).crawl("newcomer").await.unwrap();

        assert!(snapshot.is_empty());
        assert!(snapshot.exhausted);
        assert_eq!(listing.fetches(), 1);
    }

    #[tokio::test]
    async fn test_page_ceiling_is_fatal() {
        let listing = Arc::new(FakeListing::paged(entries(100), 10));
        let result = crawler(&listing).with_page_ceiling(3).crawl("endless").await;

        assert!(matches!(
            result,
            Err(CrawlError::LimitExceeded { ceiling: 3, .. })
        ));
        assert_eq!(listing.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let listing = Arc::new(FakeListing::paged(entries(5), 20).fail_page(1, http_status(503)));
        let snapshot = crawler(&listing).crawl("cinephile").await.unwrap();

        assert_eq!(snapshot.len(), 5);
        // failed attempt + retry of page 1, then page 2
        assert_eq!(listing.fetches(), 3);
    }

    #[tokio::test]
    async fn test_failure_mid_crawl_yields_no_snapshot() {
        let listing = Arc::new(FakeListing::paged(entries(45), 20).fail_page(2, http_status(403)));
        let result = crawler(&listing).with_page_size_hint(20).crawl("cinephile").await;

        match result {
            Err(CrawlError::Fetch { page, username, .. }) => {
                assert_eq!(page, 2);
                assert_eq!(username, "cinephile");
            }
            other => panic!("expected fetch error, got {:?}", other.map(|s| s.len())),
        }
        assert_eq!(listing.fetches(), 2);
    }
}
