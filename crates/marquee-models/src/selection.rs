use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::{RawEntry, ResolvedMovie};

/// An entry the consumer asked to keep resolved regardless of the visible window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PinnedEntry {
    pub entry: RawEntry,
    pub catalog_id: Option<u64>, // Known when the pin came from an earlier resolution
}

impl PinnedEntry {
    pub fn new(entry: RawEntry) -> Self {
        Self { entry, catalog_id: None }
    }

    pub fn from_movie(movie: &ResolvedMovie) -> Self {
        Self {
            entry: RawEntry {
                title: movie.title.clone(),
                year: movie.release_year.map(|y| y.to_string()),
            },
            catalog_id: Some(movie.id),
        }
    }
}

/// A historical record of movies picked from a watchlist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectionLog {
    pub identity: String,
    pub username: String,
    pub picks: Vec<ResolvedMovie>,
    pub selected_at: DateTime<Utc>,
}
