use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of a listing page, split into title and optional release year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RawEntry {
    pub title: String,
    pub year: Option<String>, // Four digits when the caption ended in "(YYYY)"
}

impl RawEntry {
    pub fn new(title: impl Into<String>, year: Option<&str>) -> Self {
        Self {
            title: title.into(),
            year: year.map(|y| y.to_string()),
        }
    }

    /// Year as a number, for comparison against catalog release years
    pub fn year_number(&self) -> Option<u32> {
        self.year.as_deref().and_then(|y| y.parse().ok())
    }
}

impl fmt::Display for RawEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.year {
            Some(year) => write!(f, "{} ({})", self.title, year),
            None => write!(f, "{}", self.title),
        }
    }
}
