use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upper bound on simultaneous catalog resolutions
pub const MAX_RESOLUTION_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_listing_base_url")]
    pub base_url: String,
    /// Hard stop for pagination; reaching it without an empty page is fatal
    #[serde(default = "default_page_ceiling")]
    pub page_ceiling: u32,
    /// Entries per full listing page; a shorter page is treated as the last one.
    /// Zero disables the hint so only an empty page ends the crawl.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_listing_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub include_adult: bool,
    #[serde(default = "default_catalog_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_failure_cooldown_secs")]
    pub failure_cooldown_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Entries still resolving after this many milliseconds are reported as pending
    #[serde(default)]
    pub pending_deadline_ms: Option<u64>,
    #[serde(default = "default_true")]
    pub persist_cache: bool,
    /// How long a command waits on exit for entries reported as pending
    #[serde(default = "default_settle_timeout_secs")]
    pub settle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_listing_retry")]
    pub listing: RetrySettings,
    #[serde(default = "default_catalog_retry")]
    pub catalog: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_size")]
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_listing_base_url() -> String {
    "https://letterboxd.com".to_string()
}

fn default_page_ceiling() -> u32 {
    500
}

fn default_page_size() -> usize {
    28 // Letterboxd grid pages
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string()
}

fn default_listing_timeout() -> u64 {
    30
}

fn default_catalog_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_catalog_timeout() -> u64 {
    20
}

fn default_cache_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_failure_cooldown_secs() -> u64 {
    120
}

fn default_max_concurrency() -> usize {
    6
}

fn default_settle_timeout_secs() -> u64 {
    30
}

fn default_listing_retry() -> RetrySettings {
    RetrySettings {
        max_attempts: 4,
        initial_backoff_ms: 500,
        max_backoff_ms: 8000,
    }
}

fn default_catalog_retry() -> RetrySettings {
    // A single transport failure is retried once
    RetrySettings {
        max_attempts: 2,
        initial_backoff_ms: 250,
        max_backoff_ms: 2000,
    }
}

fn default_window_size() -> usize {
    20
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            base_url: default_listing_base_url(),
            page_ceiling: default_page_ceiling(),
            page_size: default_page_size(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_listing_timeout(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            image_base_url: default_image_base_url(),
            language: default_language(),
            include_adult: false,
            request_timeout_secs: default_catalog_timeout(),
        }
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            failure_cooldown_secs: default_failure_cooldown_secs(),
            max_concurrency: default_max_concurrency(),
            pending_deadline_ms: None,
            persist_cache: true,
            settle_timeout_secs: default_settle_timeout_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            listing: default_listing_retry(),
            catalog: default_catalog_retry(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: default_window_size(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config file if present, otherwise fall back to defaults
    pub fn load_or_default(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, url) in [("listing.base_url", &self.listing.base_url), ("catalog.base_url", &self.catalog.base_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!("{} must be an http(s) URL, got '{}'", name, url));
            }
        }

        if self.listing.page_ceiling == 0 {
            return Err(anyhow::anyhow!("listing.page_ceiling must be at least 1"));
        }
        if self.window.size == 0 {
            return Err(anyhow::anyhow!("window.size must be at least 1"));
        }

        let concurrency = self.resolution.max_concurrency;
        if concurrency == 0 || concurrency > MAX_RESOLUTION_CONCURRENCY {
            return Err(anyhow::anyhow!(
                "resolution.max_concurrency must be between 1 and {}, got {}",
                MAX_RESOLUTION_CONCURRENCY, concurrency
            ));
        }

        for (name, retry) in [("retry.listing", &self.retry.listing), ("retry.catalog", &self.retry.catalog)] {
            if retry.max_attempts == 0 {
                return Err(anyhow::anyhow!("{}.max_attempts must be at least 1", name));
            }
            if retry.max_backoff_ms < retry.initial_backoff_ms {
                return Err(anyhow::anyhow!("{}.max_backoff_ms must not be below initial_backoff_ms", name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.listing.page_ceiling = 42;
        config.window.size = 12;
        config.resolution.pending_deadline_ms = Some(1500);

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.listing.page_ceiling, 42);
        assert_eq!(loaded.window.size, 12);
        assert_eq!(loaded.resolution.pending_deadline_ms, Some(1500));
        assert_eq!(loaded.retry.catalog, default_catalog_retry());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[window]\nsize = 5\n").unwrap();
        assert_eq!(config.window.size, 5);
        assert_eq!(config.listing.page_ceiling, 500);
        assert_eq!(config.resolution.cache_ttl_secs, 3600);
        assert_eq!(config.resolution.settle_timeout_secs, 30);
        assert_eq!(config.retry.catalog.max_attempts, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.window.size, 20);
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.resolution.max_concurrency = 16;
        assert!(config.validate().is_err());
        config.resolution.max_concurrency = 4;

        config.listing.page_ceiling = 0;
        assert!(config.validate().is_err());
        config.listing.page_ceiling = 10;

        config.catalog.base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());
        config.catalog.base_url = default_catalog_base_url();

        config.retry.listing.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
