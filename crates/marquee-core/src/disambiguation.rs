use marquee_models::{Candidate, RawEntry, ResolutionKey};

/// Choose one catalog candidate for a listing entry.
///
/// When the entry carries a year, a candidate with exactly that release year
/// and the same full title (case-insensitive) wins regardless of rank.
/// Otherwise the catalog's own top result is trusted, even for titles that
/// are remade often.
pub fn select_candidate<'a>(candidates: &'a [Candidate], entry: &RawEntry) -> Option<&'a Candidate> {
    if let Some(year) = entry.year_number() {
        let exact = candidates
            .iter()
            .find(|c| c.release_year == Some(year) && titles_match(&c.title, &entry.title));
        if exact.is_some() {
            return exact;
        }
    }
    candidates.first()
}

pub fn titles_match(a: &str, b: &str) -> bool {
    ResolutionKey::normalize_title(a) == ResolutionKey::normalize_title(b)
}
