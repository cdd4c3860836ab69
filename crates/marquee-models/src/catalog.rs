use serde::{Deserialize, Serialize};

/// One search hit, in the catalog's own relevance order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: u64,
    pub title: String,
    pub release_year: Option<u32>,
}

/// Full detail for a single catalog id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogRecord {
    pub id: u64,
    pub title: String,
    pub release_year: Option<u32>,
    pub poster_url: Option<String>,
    pub genres: Vec<String>,
    pub runtime_minutes: Option<u32>,
    pub overview: String,
    pub original_language: String,
    pub production_countries: Vec<String>,
    pub cast: Vec<CastCredit>, // Catalog billing order
    pub crew: Vec<CrewCredit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastCredit {
    pub name: String,
    pub character: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewCredit {
    pub name: String,
    pub job: String,
}
