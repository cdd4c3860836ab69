pub mod traits;
pub mod error;
pub mod letterboxd;
pub mod tmdb;

pub use traits::{CatalogClient, ListingSource};
pub use error::SourceError;
pub use letterboxd::LetterboxdClient;
pub use tmdb::TmdbClient;
