use crate::RawEntry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key for a resolution.
///
/// A catalog identifier is preferred when one is already known. Otherwise the
/// normalized title alone is used: the year only disambiguates between search
/// candidates and is deliberately not part of the key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResolutionKey {
    CatalogId(u64),
    Title(String),
}

impl ResolutionKey {
    pub fn from_entry(entry: &RawEntry) -> Self {
        ResolutionKey::Title(Self::normalize_title(&entry.title))
    }

    pub fn for_entry(entry: &RawEntry, known_id: Option<u64>) -> Self {
        match known_id {
            Some(id) => ResolutionKey::CatalogId(id),
            None => Self::from_entry(entry),
        }
    }

    /// Lowercase, trim, and collapse internal whitespace
    pub fn normalize_title(title: &str) -> String {
        title
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionKey::CatalogId(id) => write!(f, "catalog:{}", id),
            ResolutionKey::Title(title) => write!(f, "title:{}", title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_is_not_part_of_key() {
        let a = ResolutionKey::from_entry(&RawEntry::new("The Thing", Some("1982")));
        let b = ResolutionKey::from_entry(&RawEntry::new("the  thing ", Some("2011")));
        assert_eq!(a, b);
        assert_eq!(a, ResolutionKey::Title("the thing".to_string()));
    }

    #[test]
    fn test_known_id_takes_precedence() {
        let entry = RawEntry::new("Heat", Some("1995"));
        assert_eq!(ResolutionKey::for_entry(&entry, Some(949)), ResolutionKey::CatalogId(949));
        assert_eq!(
            ResolutionKey::for_entry(&entry, None),
            ResolutionKey::Title("heat".to_string())
        );
    }
}
