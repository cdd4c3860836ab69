use crate::error::SourceError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub total_results: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MovieDetail {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
    #[serde(default)]
    pub credits: Option<Credits>,
}

#[derive(Debug, Deserialize)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductionCountry {
    #[serde(rename = "iso_3166_1")]
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CrewMember {
    pub name: String,
    #[serde(default)]
    pub job: String,
}

/// Search parameters for `GET /search/movie`
pub struct SearchQuery<'a> {
    pub title: &'a str,
    pub year: Option<u32>,
    pub language: &'a str,
    pub include_adult: bool,
}

/// Remove commas and normalize whitespace to improve search matching
pub fn normalize_title_for_search(title: &str) -> String {
    title
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Year from a `YYYY-MM-DD` release date; empty or malformed dates give none
pub fn release_year(release_date: Option<&str>) -> Option<u32> {
    let date = release_date?;
    let year = date.get(0..4)?;
    if year.chars().all(|c| c.is_ascii_digit()) {
        year.parse().ok()
    } else {
        None
    }
}

/// Search movies by title
/// Reference: https://developer.themoviedb.org/reference/search-movie
pub async fn search_movie(
    client: &Client,
    base_url: &str,
    api_key: &str,
    query: &SearchQuery<'_>,
) -> Result<SearchResponse, SourceError> {
    let url = format!("{}/search/movie", base_url);
    let normalized = normalize_title_for_search(query.title);

    let mut params: Vec<(&str, String)> = vec![
        ("api_key", api_key.to_string()),
        ("query", normalized.clone()),
        ("include_adult", query.include_adult.to_string()),
        ("language", query.language.to_string()),
        ("page", "1".to_string()),
    ];
    if let Some(year) = query.year {
        params.push(("year", year.to_string()));
    }

    let response: SearchResponse = get_json(client, &url, &params).await?;
    debug!(
        "TMDB search for '{}' (normalized: '{}', year: {:?}): {} result(s)",
        query.title, normalized, query.year, response.total_results
    );
    Ok(response)
}

/// Movie detail with credits in a single request
/// Reference: https://developer.themoviedb.org/reference/movie-details
pub async fn movie_detail(
    client: &Client,
    base_url: &str,
    api_key: &str,
    language: &str,
    id: u64,
) -> Result<MovieDetail, SourceError> {
    let url = format!("{}/movie/{}", base_url, id);
    let params = [
        ("api_key", api_key.to_string()),
        ("append_to_response", "credits".to_string()),
        ("language", language.to_string()),
    ];
    get_json(client, &url, &params).await
}

async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    params: &[(&str, String)],
) -> Result<T, SourceError> {
    let response = client
        .get(url)
        .query(params)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|source| SourceError::Transport { url: url.to_string(), source })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(url.to_string()));
    }
    if !status.is_success() {
        return Err(SourceError::Status { url: url.to_string(), status: status.as_u16() });
    }

    let body = response
        .text()
        .await
        .map_err(|source| SourceError::Transport { url: url.to_string(), source })?;

    serde_json::from_str(&body).map_err(|e| SourceError::InvalidResponse {
        url: url.to_string(),
        message: e.to_string(),
    })
}
