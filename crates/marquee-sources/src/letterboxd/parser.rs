use marquee_models::RawEntry;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

static TITLE_YEAR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s+\(([0-9]{4})\)$").expect("title/year regex should compile")
});

// Grid layouts have used both class names over time
static POSTER_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("li.poster-container, li.griditem").expect("poster selector should parse")
});
static CAPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".frame-title").expect("caption selector should parse")
});
static IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("img[alt]").expect("image selector should parse")
});

const DISPLAY_NAME_ATTRIBUTES: [&str; 2] = ["data-item-full-display-name", "data-original-title"];

/// Split a caption into title and year using the `Title (YYYY)` grammar.
///
/// Captions that do not end in a parenthesized four-digit year keep the whole
/// string as the title.
pub fn split_title_year(caption: &str) -> RawEntry {
    let caption = caption.trim();
    match TITLE_YEAR_PATTERN.captures(caption) {
        Some(caps) => RawEntry {
            title: caps[1].to_string(),
            year: Some(caps[2].to_string()),
        },
        None => RawEntry {
            title: caption.to_string(),
            year: None,
        },
    }
}

/// Parse one rendered listing page into raw entries, in page order.
///
/// A page without poster captions yields an empty vector; that is how the end
/// of the listing shows up, not an error.
pub fn parse_listing_page(markup: &str) -> Vec<RawEntry> {
    let document = Html::parse_document(markup);
    let mut entries = Vec::new();
    let mut skipped = 0;

    for poster in document.select(&POSTER_SELECTOR) {
        match caption_for(poster) {
            Some(caption) => {
                trace!(caption = %caption, "Listing caption");
                entries.push(split_title_year(&caption));
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("Listing page: {} poster(s) without a usable caption were skipped", skipped);
    }
    debug!("Listing page parsed: {} entries", entries.len());
    entries
}

/// Caption for one poster: the visible frame title first, then display-name
/// attributes, then the poster image alt text
fn caption_for(poster: ElementRef<'_>) -> Option<String> {
    if let Some(frame_title) = poster.select(&CAPTION_SELECTOR).next() {
        let text = collapse_whitespace(&frame_title.text().collect::<String>());
        if !text.is_empty() {
            return Some(text);
        }
    }

    // descendants() starts with the poster element itself
    for element in poster.descendants().filter_map(ElementRef::wrap) {
        for attribute in DISPLAY_NAME_ATTRIBUTES {
            if let Some(value) = element.value().attr(attribute) {
                let text = collapse_whitespace(value);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }

    poster
        .select(&IMAGE_SELECTOR)
        .filter_map(|img| img.value().attr("alt"))
        .map(collapse_whitespace)
        .find(|alt| !alt.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
