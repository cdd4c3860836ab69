pub mod client;
pub mod parser;

pub use client::LetterboxdClient;
pub use parser::{parse_listing_page, split_title_year};
