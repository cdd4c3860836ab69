use marquee_sources::SourceError;
use thiserror::Error;

/// Crawl failures are all-or-nothing: no partial snapshot accompanies them
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("listing for '{username}' is unreachable (page {page}): {source}")]
    Fetch {
        username: String,
        page: u32,
        #[source]
        source: SourceError,
    },

    #[error("listing for '{username}' was still returning entries at page {ceiling}; giving up (the listing format may have changed)")]
    LimitExceeded { username: String, ceiling: u32 },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no catalog match for '{0}'")]
    NotFound(String),

    #[error("catalog request failed: {0}")]
    Upstream(String),
}

impl ResolveError {
    /// Short category label for summaries
    pub fn category(&self) -> &'static str {
        match self {
            ResolveError::NotFound(_) => "not_found",
            ResolveError::Upstream(_) => "upstream",
        }
    }
}

impl From<SourceError> for ResolveError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::NotFound(what) => ResolveError::NotFound(what),
            other => ResolveError::Upstream(other.to_string()),
        }
    }
}

/// Cache-level failure, shared by every caller waiting on the same key
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("resolution failed: {reason}")]
pub struct ResolutionFailed {
    pub reason: ResolveError,
}

impl ResolutionFailed {
    pub fn new(reason: ResolveError) -> Self {
        Self { reason }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("no credential presented")]
    Missing,

    #[error("credential rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
