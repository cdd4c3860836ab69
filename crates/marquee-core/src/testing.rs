//! In-memory collaborators shared by the unit tests of this crate

use async_trait::async_trait;
use marquee_models::{Candidate, CastCredit, CatalogRecord, CrewCredit, RawEntry};
use marquee_sources::{CatalogClient, ListingSource, SourceError};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn entries(count: usize) -> Vec<RawEntry> {
    (1..=count)
        .map(|n| RawEntry::new(format!("Movie {}", n), Some("2001")))
        .collect()
}

pub fn http_status(status: u16) -> SourceError {
    SourceError::Status {
        url: "https://listing.test".to_string(),
        status,
    }
}

/// Serves pre-split pages. The markup is just the page number.
pub struct FakeListing {
    pages: Vec<Vec<RawEntry>>,
    failures: Mutex<HashMap<u32, VecDeque<SourceError>>>,
    fetches: AtomicU32,
}

impl FakeListing {
    pub fn new(pages: Vec<Vec<RawEntry>>) -> Self {
        Self {
            pages,
            failures: Mutex::new(HashMap::new()),
            fetches: AtomicU32::new(0),
        }
    }

    /// Split `all` into pages of `page_size`, like the real listing does
    pub fn paged(all: Vec<RawEntry>, page_size: usize) -> Self {
        Self::new(all.chunks(page_size).map(|c| c.to_vec()).collect())
    }

    /// Queue an error for the next fetch of `page`
    pub fn fail_page(self, page: u32, error: SourceError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .entry(page)
            .or_default()
            .push_back(error);
        self
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingSource for FakeListing {
    fn source_name(&self) -> &str {
        "fake-listing"
    }

    async fn fetch_page(&self, _username: &str, page: u32) -> Result<String, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&page)
            .and_then(|queue| queue.pop_front())
        {
            return Err(error);
        }
        Ok(page.to_string())
    }

    fn parse_page(&self, markup: &str) -> Vec<RawEntry> {
        let page: usize = markup.parse().unwrap();
        self.pages.get(page - 1).cloned().unwrap_or_default()
    }
}

pub fn record(id: u64, title: &str, year: u32) -> CatalogRecord {
    CatalogRecord {
        id,
        title: title.to_string(),
        release_year: Some(year),
        poster_url: None,
        genres: vec!["Drama".to_string()],
        runtime_minutes: Some(100),
        overview: format!("About {}", title),
        original_language: "en".to_string(),
        production_countries: vec!["US".to_string()],
        cast: (1..=8)
            .map(|n| CastCredit { name: format!("Actor {}", n), character: None })
            .collect(),
        crew: vec![
            CrewCredit { name: "Someone Else".to_string(), job: "Producer".to_string() },
            CrewCredit { name: format!("Director of {}", title), job: "Director".to_string() },
        ],
    }
}

/// Catalog keyed by lowercase title. Unknown titles return no candidates.
#[derive(Default)]
pub struct FakeCatalog {
    by_title: HashMap<String, Vec<CatalogRecord>>,
    delay: Option<Duration>,
    failing: Mutex<u32>,
    searches: AtomicU32,
    details: AtomicU32,
    in_flight: AtomicU32,
    peak_in_flight: AtomicU32,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, record: CatalogRecord) -> Self {
        self.by_title
            .entry(record.title.to_lowercase())
            .or_default()
            .push(record);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next `count` searches with a permanent upstream error
    pub fn failing_searches(self, count: u32) -> Self {
        *self.failing.lock().unwrap() = count;
        self
    }

    pub fn searches(&self) -> u32 {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn details(&self) -> u32 {
        self.details.load(Ordering::SeqCst)
    }

    /// Most searches ever running at the same time
    pub fn peak_in_flight(&self) -> u32 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    fn catalog_name(&self) -> &str {
        "fake-catalog"
    }

    async fn search(&self, title: &str, _year: Option<u32>) -> Result<Vec<Candidate>, SourceError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        {
            let mut failing = self.failing.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(http_status(403));
            }
        }
        Ok(self
            .by_title
            .get(&title.to_lowercase())
            .map(|records| {
                records
                    .iter()
                    .map(|r| Candidate { id: r.id, title: r.title.clone(), release_year: r.release_year })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn detail(&self, id: u64) -> Result<CatalogRecord, SourceError> {
        self.details.fetch_add(1, Ordering::SeqCst);
        self.by_title
            .values()
            .flatten()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("movie {}", id)))
    }
}
