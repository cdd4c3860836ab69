use crate::error::SourceError;
use crate::tmdb::api;
use crate::traits::CatalogClient;
use async_trait::async_trait;
use marquee_config::CatalogConfig;
use marquee_models::{Candidate, CastCredit, CatalogRecord, CrewCredit};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct TmdbClient {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    image_base_url: String,
    language: String,
    include_adult: bool,
}

impl TmdbClient {
    pub fn new(config: &CatalogConfig, api_key: String) -> Result<Self, SourceError> {
        if api_key.trim().is_empty() {
            return Err(SourceError::InvalidRequest("catalog API key is not configured".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SourceError::InvalidRequest(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            image_base_url: config.image_base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            include_adult: config.include_adult,
        })
    }

    fn poster_url(&self, poster_path: Option<&str>) -> Option<String> {
        poster_path
            .filter(|p| !p.is_empty())
            .map(|p| format!("{}/{}", self.image_base_url, p.trim_start_matches('/')))
    }

    fn to_record(&self, detail: api::MovieDetail) -> CatalogRecord {
        let credits = detail.credits.unwrap_or_default();
        CatalogRecord {
            id: detail.id,
            release_year: api::release_year(detail.release_date.as_deref()),
            poster_url: self.poster_url(detail.poster_path.as_deref()),
            title: detail.title,
            genres: detail.genres.into_iter().map(|g| g.name).collect(),
            runtime_minutes: detail.runtime.filter(|r| *r > 0),
            overview: detail.overview.unwrap_or_default(),
            original_language: detail.original_language,
            production_countries: detail.production_countries.into_iter().map(|c| c.name).collect(),
            cast: credits
                .cast
                .into_iter()
                .map(|c| CastCredit { name: c.name, character: c.character })
                .collect(),
            crew: credits
                .crew
                .into_iter()
                .map(|c| CrewCredit { name: c.name, job: c.job })
                .collect(),
        }
    }
}

#[async_trait]
impl CatalogClient for TmdbClient {
    fn catalog_name(&self) -> &str {
        "tmdb"
    }

    async fn search(&self, title: &str, year: Option<u32>) -> Result<Vec<Candidate>, SourceError> {
        let query = api::SearchQuery {
            title,
            year,
            language: &self.language,
            include_adult: self.include_adult,
        };
        let response = api::search_movie(&self.client, &self.base_url, &self.api_key, &query).await?;

        Ok(response
            .results
            .into_iter()
            .map(|r| Candidate {
                id: r.id,
                release_year: api::release_year(r.release_date.as_deref()),
                title: r.title,
            })
            .collect())
    }

    async fn detail(&self, id: u64) -> Result<CatalogRecord, SourceError> {
        let detail = api::movie_detail(&self.client, &self.base_url, &self.api_key, &self.language, id).await?;
        Ok(self.to_record(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TmdbClient {
        TmdbClient::new(&CatalogConfig::default(), "key".to_string()).unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        assert!(TmdbClient::new(&CatalogConfig::default(), "  ".to_string()).is_err());
    }

    #[test]
    fn test_record_conversion() {
        let detail: api::MovieDetail = serde_json::from_str(
            r#"{
                "id": 11,
                "title": "Star Wars",
                "release_date": "1977-05-25",
                "poster_path": "/6FfCtAuVAW8XJjZ7eWeLibRLWTw.jpg",
                "genres": [{"name": "Adventure"}, {"name": "Science Fiction"}],
                "runtime": 0,
                "overview": "Princess Leia is captured.",
                "original_language": "en",
                "production_countries": [{"iso_3166_1": "US", "name": "United States of America"}],
                "credits": {"cast": [{"name": "Mark Hamill", "character": "Luke Skywalker"}], "crew": []}
            }"#,
        )
        .unwrap();

        let record = client().to_record(detail);
        assert_eq!(record.release_year, Some(1977));
        assert_eq!(
            record.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/6FfCtAuVAW8XJjZ7eWeLibRLWTw.jpg")
        );
        assert_eq!(record.genres, vec!["Adventure", "Science Fiction"]);
        assert_eq!(record.runtime_minutes, None);
        assert_eq!(record.cast[0].name, "Mark Hamill");
        assert!(record.crew.is_empty());
    }
}
