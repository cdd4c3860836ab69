use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical movie record assembled from a catalog detail query.
///
/// Never mutated after creation; a re-resolution produces a new record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedMovie {
    pub id: u64,
    pub title: String,
    pub release_year: Option<u32>,
    pub poster_url: Option<String>,
    pub genres: Vec<String>,
    pub director: String, // "N/A" when no crew member is credited as Director
    pub runtime_minutes: Option<u32>,
    pub synopsis: String,
    pub cast: Vec<String>, // Top six, in billing order
    pub language: String,
    pub countries: Vec<String>,
    pub resolved_at: DateTime<Utc>,
}
