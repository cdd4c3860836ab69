use async_trait::async_trait;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use marquee_config::{Config, CredentialStore, PathManager, CATALOG_API_KEY_ENV};
use marquee_core::{
    CallerIdentity, Crawler, FileStore, IdentityProvider, LocalIdentityProvider, MetadataResolver,
    ResolutionCache, ResolutionCacheStorage, RetryPolicy, WatchlistService,
};
use marquee_models::{Candidate, CatalogRecord};
use marquee_sources::{CatalogClient, LetterboxdClient, SourceError, TmdbClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Stands in for the catalog when no API key is configured, for commands
/// that never resolve anything
struct CatalogUnavailable;

#[async_trait]
impl CatalogClient for CatalogUnavailable {
    fn catalog_name(&self) -> &str {
        "unconfigured"
    }

    async fn search(&self, _title: &str, _year: Option<u32>) -> Result<Vec<Candidate>, SourceError> {
        Err(missing_key())
    }

    async fn detail(&self, _id: u64) -> Result<CatalogRecord, SourceError> {
        Err(missing_key())
    }
}

fn missing_key() -> SourceError {
    SourceError::InvalidRequest(format!(
        "no TMDB API key configured; run `marquee config set-api-key` or set {}",
        CATALOG_API_KEY_ENV
    ))
}

/// Everything a command needs, wired from config and credentials
pub struct AppContext {
    pub config: Config,
    pub identity: CallerIdentity,
    pub service: WatchlistService,
    cache_storage: Option<ResolutionCacheStorage>,
}

impl AppContext {
    pub fn load(profile: &str, needs_catalog: bool) -> Result<Self> {
        let paths = PathManager::default();
        paths
            .ensure_directories()
            .map_err(|e| eyre!("Failed to create data directories: {}", e))?;

        let config_file = paths.config_file();
        let config = Config::load_or_default(&config_file)
            .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
        config
            .validate()
            .map_err(|e| eyre!("Invalid configuration in {}: {}", config_file.display(), e))?;

        let identity = LocalIdentityProvider
            .identify(profile)
            .map_err(|e| eyre!("Invalid profile: {}", e))?;
        debug!("Running as {}", identity);

        let listing = LetterboxdClient::new(&config.listing)
            .map_err(|e| eyre!("Failed to create listing client: {}", e))?;
        let crawler = Crawler::from_config(Arc::new(listing), &config.listing, &config.retry.listing);

        let credentials_file = paths.credentials_file();
        let mut credentials = CredentialStore::new(credentials_file.clone());
        credentials
            .load()
            .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;

        let catalog: Arc<dyn CatalogClient> = match credentials.resolve_catalog_api_key() {
            Some(key) => Arc::new(
                TmdbClient::new(&config.catalog, key).map_err(|e| eyre!("Failed to create catalog client: {}", e))?,
            ),
            None if needs_catalog => return Err(eyre!("{}", missing_key())),
            None => Arc::new(CatalogUnavailable),
        };
        let resolver = MetadataResolver::new(catalog, RetryPolicy::from_settings(&config.retry.catalog))
            .with_concurrency_limit(config.resolution.max_concurrency);

        let cache = ResolutionCache::new(
            Duration::from_secs(config.resolution.cache_ttl_secs),
            Duration::from_secs(config.resolution.failure_cooldown_secs),
        );
        let cache_storage = if config.resolution.persist_cache {
            let storage = ResolutionCacheStorage::new(paths.resolution_cache_file());
            if let Err(e) = storage.load_into(&cache) {
                warn!("Starting with a cold resolution cache: {}", e);
            }
            Some(storage)
        } else {
            None
        };

        let service = WatchlistService::new(
            crawler,
            Arc::new(resolver),
            cache,
            Arc::new(FileStore::new(paths.store_dir())),
        )
        .with_max_concurrency(config.resolution.max_concurrency)
        .with_pending_deadline(config.resolution.pending_deadline_ms.map(Duration::from_millis));

        Ok(Self {
            config,
            identity,
            service,
            cache_storage,
        })
    }

    /// Let pending resolutions finish, then write fresh ones back to disk.
    /// Failures only cost a warm start.
    pub async fn persist_cache(&self) {
        let Some(storage) = &self.cache_storage else {
            return;
        };
        let limit = Duration::from_secs(self.config.resolution.settle_timeout_secs);
        let unfinished = self.service.cache().settle(limit).await;
        if unfinished > 0 {
            warn!("{} resolution(s) did not finish within {:?} and will not be saved", unfinished, limit);
        }
        let stats = self.service.cache().stats();
        debug!(
            "Resolution cache: {} hits, {} misses, {} coalesced, {} cooling down, {} entries",
            stats.hits, stats.misses, stats.coalesced, stats.cooled_down, stats.entries
        );
        if let Err(e) = storage.save(self.service.cache()) {
            warn!("Failed to save resolution cache to {:?}: {}", storage.path(), e);
        }
    }
}
