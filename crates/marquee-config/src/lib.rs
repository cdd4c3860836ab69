pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{CatalogConfig, Config, MAX_RESOLUTION_CONCURRENCY, ListingConfig, LoggingConfig, ResolutionConfig, RetryConfig, RetrySettings, WindowConfig};
pub use credentials::{mask_secret, CredentialStore, CATALOG_API_KEY_ENV};
pub use paths::{PathManager, container_base_path};
