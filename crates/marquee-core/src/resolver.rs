use crate::disambiguation::select_candidate;
use crate::error::ResolveError;
use crate::resolution_cache::{CacheOrigin, ResolutionCache, ResolutionOutcome};
use crate::retry::RetryPolicy;
use chrono::Utc;
use marquee_config::MAX_RESOLUTION_CONCURRENCY;
use marquee_models::{CatalogRecord, RawEntry, ResolutionKey, ResolvedMovie};
use marquee_sources::CatalogClient;
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

pub const CAST_LIMIT: usize = 6;
pub const DIRECTOR_JOB: &str = "Director";
pub const UNKNOWN_DIRECTOR: &str = "N/A";

const DEFAULT_CONCURRENCY: usize = 6;

/// Maps listing entries to canonical catalog records.
///
/// Every catalog call goes through the shared retry policy, and the number of
/// resolutions talking to the catalog at once is capped by a semaphore.
pub struct MetadataResolver {
    catalog: Arc<dyn CatalogClient>,
    retry: RetryPolicy,
    permits: Semaphore,
}

impl MetadataResolver {
    /// Resolve against `catalog`, retrying transient failures with `retry`
    pub fn new(catalog: Arc<dyn CatalogClient>, retry: RetryPolicy) -> Self {
        Self {
            catalog,
            retry,
            permits: Semaphore::new(DEFAULT_CONCURRENCY),
        }
    }

    /// Clamped to 1..=MAX_RESOLUTION_CONCURRENCY
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.permits = Semaphore::new(limit.clamp(1, MAX_RESOLUTION_CONCURRENCY));
        self
    }

    /// Search, disambiguate, then fetch full detail for the chosen candidate
    pub async fn resolve(&self, entry: &RawEntry) -> Result<ResolvedMovie, ResolveError> {
        let _permit = self.acquire().await?;

        let label = format!("catalog search for '{}'", entry);
        let candidates = self
            .retry
            .run(&label, || self.catalog.search(&entry.title, entry.year_number()))
            .await?;

        let chosen = select_candidate(&candidates, entry)
            .ok_or_else(|| ResolveError::NotFound(entry.to_string()))?;
        debug!(
            "'{}' -> catalog id {} ({} candidates)",
            entry,
            chosen.id,
            candidates.len()
        );

        self.fetch_detail(chosen.id).await
    }

    /// Skip the search when the catalog id is already known
    pub async fn resolve_by_id(&self, id: u64) -> Result<ResolvedMovie, ResolveError> {
        let _permit = self.acquire().await?;
        self.fetch_detail(id).await
    }

    /// Resolve through the shared cache, keyed by the known id when there is one
    pub async fn resolve_cached(
        self: &Arc<Self>,
        cache: &ResolutionCache,
        entry: &RawEntry,
        known_id: Option<u64>,
    ) -> (ResolutionOutcome, CacheOrigin) {
        let key = ResolutionKey::for_entry(entry, known_id);
        let resolver = Arc::clone(self);
        let entry = entry.clone();

        cache
            .get_or_resolve_traced(key, move || async move {
                match known_id {
                    Some(id) => resolver.resolve_by_id(id).await,
                    None => resolver.resolve(&entry).await,
                }
            })
            .await
    }

    async fn fetch_detail(&self, id: u64) -> Result<ResolvedMovie, ResolveError> {
        let label = format!("catalog detail for {}", id);
        let record = self.retry.run(&label, || self.catalog.detail(id)).await?;
        Ok(assemble_movie(record))
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, ResolveError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| ResolveError::Upstream("resolver is shutting down".to_string()))
    }
}

/// Flatten a catalog record into a movie: first 6 cast members, first Director
pub fn assemble_movie(record: CatalogRecord) -> ResolvedMovie {
    let director = record
        .crew
        .iter()
        .find(|member| member.job == DIRECTOR_JOB)
        .map(|member| member.name.clone())
        .unwrap_or_else(|| UNKNOWN_DIRECTOR.to_string());

    ResolvedMovie {
        id: record.id,
        title: record.title,
        release_year: record.release_year,
        poster_url: record.poster_url,
        genres: record.genres,
        director,
        runtime_minutes: record.runtime_minutes,
        synopsis: record.overview,
        cast: record
            .cast
            .into_iter()
            .take(CAST_LIMIT)
            .map(|credit| credit.name)
            .collect(),
        language: record.original_language,
        countries: record.production_countries,
        resolved_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, FakeCatalog};
    use std::time::Duration;

    fn resolver(catalog: &Arc<FakeCatalog>) -> Arc<MetadataResolver> {
        Arc::new(MetadataResolver::new(
            catalog.clone(),
            RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(1)),
        ))
    }

    #[tokio::test]
    async fn test_year_picks_second_ranked_candidate() {
        let catalog = Arc::new(
            FakeCatalog::new()
                .with_record(record(10, "A", 2010))
                .with_record(record(20, "A", 1999)),
        );
        let movie = resolver(&catalog)
            .resolve(&RawEntry::new("A", Some("1999")))
            .await
            .unwrap();

        assert_eq!(movie.id, 20);
        assert_eq!(movie.release_year, Some(1999));
        assert_eq!(catalog.searches(), 1);
        assert_eq!(catalog.details(), 1);
    }

    #[tokio::test]
    async fn test_assembles_cast_and_director() {
        let catalog = Arc::new(FakeCatalog::new().with_record(record(1, "Chinatown", 1974)));
        let movie = resolver(&catalog)
            .resolve(&RawEntry::new("Chinatown", None))
            .await
            .unwrap();

        assert_eq!(movie.cast.len(), CAST_LIMIT);
        assert_eq!(movie.cast[0], "Actor 1");
        assert_eq!(movie.director, "Director of Chinatown");
        assert_eq!(movie.synopsis, "About Chinatown");
    }

    #[test]
    fn test_missing_director_is_placeholder() {
        let mut detail = record(5, "Koyaanisqatsi", 1982);
        detail.crew.retain(|member| member.job != DIRECTOR_JOB);
        detail.cast.truncate(2);

        let movie = assemble_movie(detail);
        assert_eq!(movie.director, UNKNOWN_DIRECTOR);
        assert_eq!(movie.cast, vec!["Actor 1", "Actor 2"]);
    }

    #[tokio::test]
    async fn test_zero_candidates_is_not_found() {
        let catalog = Arc::new(FakeCatalog::new());
        let result = resolver(&catalog).resolve(&RawEntry::new("Unknown Film", None)).await;

        assert_eq!(result, Err(ResolveError::NotFound("Unknown Film".to_string())));
        assert_eq!(catalog.details(), 0);
    }

    #[tokio::test]
    async fn test_catalog_failure_is_upstream() {
        let catalog = Arc::new(
            FakeCatalog::new()
                .with_record(record(1, "Vertigo", 1958))
                .failing_searches(1),
        );
        let result = resolver(&catalog).resolve(&RawEntry::new("Vertigo", None)).await;

        assert!(matches!(result, Err(ResolveError::Upstream(_))));
        // 403 is permanent, so no retry
        assert_eq!(catalog.searches(), 1);
    }

    #[tokio::test]
    async fn test_known_id_skips_search() {
        let catalog = Arc::new(FakeCatalog::new().with_record(record(42, "Playtime", 1967)));
        let resolver = resolver(&catalog);
        let cache = ResolutionCache::default();

        let (outcome, origin) = resolver
            .resolve_cached(&cache, &RawEntry::new("Playtime", Some("1967")), Some(42))
            .await;

        assert_eq!(outcome.unwrap().title, "Playtime");
        assert_eq!(origin, CacheOrigin::Resolved);
        assert_eq!(catalog.searches(), 0);
        assert_eq!(catalog.details(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit_caps_catalog_calls() {
        let mut catalog = FakeCatalog::new().with_delay(Duration::from_millis(20));
        for n in 1..=6 {
            catalog = catalog.with_record(record(n, &format!("Film {}", n), 2000));
        }
        let catalog = Arc::new(catalog);
        let resolver = Arc::new(
            MetadataResolver::new(catalog.clone(), RetryPolicy::none()).with_concurrency_limit(2),
        );
        let cache = ResolutionCache::default();

        let entries: Vec<RawEntry> = (1..=6).map(|n| RawEntry::new(format!("Film {}", n), None)).collect();
        let outcomes = futures::future::join_all(
            entries.iter().map(|entry| resolver.resolve_cached(&cache, entry, None)),
        )
        .await;

        assert!(outcomes.iter().all(|(outcome, _)| outcome.is_ok()));
        assert_eq!(catalog.searches(), 6);
        assert_eq!(catalog.peak_in_flight(), 2);
    }
}
