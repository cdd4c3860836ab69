use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl SourceError {
    /// Whether repeating the same request might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Transport { source, .. } => !source.is_builder() && !source.is_decode(),
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            SourceError::NotFound(_)
            | SourceError::InvalidResponse { .. }
            | SourceError::InvalidRequest(_) => false,
        }
    }
}
