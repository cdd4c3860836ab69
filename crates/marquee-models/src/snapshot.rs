use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::RawEntry;

/// Ordered watchlist entries for one external username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistSnapshot {
    pub username: String,
    pub entries: Vec<RawEntry>,
    pub exhausted: bool, // Set once, when the crawl reaches the end of the listing
    pub pages_fetched: u32,
    pub crawled_at: DateTime<Utc>,
}

impl WatchlistSnapshot {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            entries: Vec::new(),
            exhausted: false,
            pages_fetched: 0,
            crawled_at: Utc::now(),
        }
    }

    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
