use async_trait::async_trait;
use marquee_models::{Candidate, CatalogRecord, RawEntry};
use crate::error::SourceError;

/// A remote, paginated watchlist listing
#[async_trait]
pub trait ListingSource: Send + Sync {
    fn source_name(&self) -> &str;

    /// Fetch the rendered markup of one listing page (1-based)
    async fn fetch_page(&self, username: &str, page: u32) -> Result<String, SourceError>;

    /// Extract the entries of one page. An empty result means the listing has ended.
    fn parse_page(&self, markup: &str) -> Vec<RawEntry>;
}

/// Read-only movie metadata catalog
#[async_trait]
pub trait CatalogClient: Send + Sync {
    fn catalog_name(&self) -> &str;

    /// Candidates in the catalog's own relevance order. The year is a filter hint.
    async fn search(&self, title: &str, year: Option<u32>) -> Result<Vec<Candidate>, SourceError>;

    async fn detail(&self, id: u64) -> Result<CatalogRecord, SourceError>;
}
