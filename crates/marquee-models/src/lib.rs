pub mod raw_entry;
pub mod resolution_key;
pub mod movie;
pub mod snapshot;
pub mod catalog;
pub mod selection;

pub use raw_entry::RawEntry;
pub use resolution_key::ResolutionKey;
pub use movie::ResolvedMovie;
pub use snapshot::WatchlistSnapshot;
pub use catalog::{Candidate, CastCredit, CatalogRecord, CrewCredit};
pub use selection::{PinnedEntry, SelectionLog};
