use crate::error::SourceError;
use crate::letterboxd::parser;
use crate::traits::ListingSource;
use async_trait::async_trait;
use marquee_config::ListingConfig;
use marquee_models::RawEntry;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct LetterboxdClient {
    client: Arc<Client>,
    base_url: String,
}

impl LetterboxdClient {
    pub fn new(config: &ListingConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SourceError::InvalidRequest(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn page_url(&self, username: &str, page: u32) -> Result<String, SourceError> {
        validate_username(username)?;
        Ok(format!(
            "{}/{}/watchlist/page/{}/",
            self.base_url,
            urlencoding::encode(username),
            page
        ))
    }
}

/// Listing usernames are slugs: letters, digits, underscore and hyphen
pub fn validate_username(username: &str) -> Result<(), SourceError> {
    if username.is_empty() {
        return Err(SourceError::InvalidRequest("username must not be empty".to_string()));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(SourceError::InvalidRequest(format!(
            "username '{}' may only contain letters, digits, '_' and '-'",
            username
        )));
    }
    Ok(())
}

/// What a listing page response status means for the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// Read the body and parse it
    Body,
    /// The listing ran out before this page; treat it as empty
    PastEnd,
}

/// Map a listing page's HTTP status onto the crawl rules.
///
/// A 404 on page 1 means the user (or their watchlist) does not exist. Past
/// the last page some layouts answer 404 instead of an empty grid. Any other
/// non-success status becomes [`SourceError::Status`], which is transient for
/// 429 and 5xx only.
pub fn classify_status(url: &str, username: &str, page: u32, status: StatusCode) -> Result<PageStatus, SourceError> {
    if status == StatusCode::NOT_FOUND {
        if page <= 1 {
            return Err(SourceError::NotFound(format!("watchlist for '{}'", username)));
        }
        return Ok(PageStatus::PastEnd);
    }
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(PageStatus::Body)
}

#[async_trait]
impl ListingSource for LetterboxdClient {
    fn source_name(&self) -> &str {
        "letterboxd"
    }

    async fn fetch_page(&self, username: &str, page: u32) -> Result<String, SourceError> {
        let url = self.page_url(username, page)?;
        debug!("Fetching listing page {} for '{}': {}", page, username, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| SourceError::Transport { url: url.clone(), source })?;

        match classify_status(&url, username, page, response.status())? {
            PageStatus::Body => response
                .text()
                .await
                .map_err(|source| SourceError::Transport { url, source }),
            PageStatus::PastEnd => {
                debug!("Listing page {} for '{}' returned 404, treating as empty", page, username);
                Ok(String::new())
            }
        }
    }

    fn parse_page(&self, markup: &str) -> Vec<RawEntry> {
        parser::parse_listing_page(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url() {
        let config = ListingConfig {
            base_url: "https://letterboxd.example/".to_string(),
            ..ListingConfig::default()
        };
        let client = LetterboxdClient::new(&config).unwrap();
        assert_eq!(
            client.page_url("film_fan-42", 3).unwrap(),
            "https://letterboxd.example/film_fan-42/watchlist/page/3/"
        );
    }

    const URL: &str = "https://letterboxd.example/cinephile/watchlist/page/1/";

    #[test]
    fn test_success_reads_body() {
        assert_eq!(classify_status(URL, "cinephile", 1, StatusCode::OK).unwrap(), PageStatus::Body);
        assert_eq!(classify_status(URL, "cinephile", 7, StatusCode::OK).unwrap(), PageStatus::Body);
    }

    #[test]
    fn test_missing_first_page_is_unknown_user() {
        let err = classify_status(URL, "cinephile", 1, StatusCode::NOT_FOUND).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(ref what) if what.contains("cinephile")));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_missing_later_page_ends_listing() {
        assert_eq!(
            classify_status(URL, "cinephile", 2, StatusCode::NOT_FOUND).unwrap(),
            PageStatus::PastEnd
        );
        assert_eq!(
            classify_status(URL, "cinephile", 40, StatusCode::NOT_FOUND).unwrap(),
            PageStatus::PastEnd
        );
    }

    #[test]
    fn test_rate_limit_and_server_errors_are_transient() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let err = classify_status(URL, "cinephile", 3, status).unwrap_err();
            assert!(
                matches!(err, SourceError::Status { status: code, .. } if code == status.as_u16()),
                "unexpected error for {}: {:?}",
                status,
                err
            );
            assert!(err.is_transient(), "{} should be retried", status);
        }
    }

    #[test]
    fn test_other_client_errors_are_permanent() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN, StatusCode::GONE] {
            let err = classify_status(URL, "cinephile", 1, status).unwrap_err();
            assert!(matches!(err, SourceError::Status { ref url, .. } if url == URL));
            assert!(!err.is_transient(), "{} should not be retried", status);
        }
    }

    #[test]
    fn test_rejects_unsafe_usernames() {
        assert!(validate_username("").is_err());
        assert!(validate_username("../admin").is_err());
        assert!(validate_username("someone?page=2").is_err());
        assert!(validate_username("cinephile_99").is_ok());
    }
}
