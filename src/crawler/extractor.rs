//! HTML extractor for quote records and the next-page link
//!
//! This module parses a fetched listing page and produces:
//! - The quote records in document order (text, author, ordered tags)
//! - The absolute address of the next page, when a "next" indicator exists
//!
//! A malformed record container is skipped with a warning and never aborts
//! the page; only transport/protocol failures (handled in the fetcher) are
//! fatal.

use crate::record::Record;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Everything extracted from one listing page
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// Records in document order
    pub records: Vec<Record>,

    /// Absolute address of the next page, if a next indicator was present
    pub next_page: Option<Url>,

    /// Number of containers skipped because their sub-structure was missing
    pub skipped: u32,
}

/// Parses a page body and extracts records plus the next-page address
///
/// Relative next-page references are resolved against `base_url`.
pub fn extract_page(html: &str, base_url: &Url) -> ExtractedPage {
    let document = Html::parse_document(html);

    let mut records = Vec::new();
    let mut skipped = 0u32;

    if let Ok(quote_selector) = Selector::parse("div.quote") {
        for container in document.select(&quote_selector) {
            match extract_record(&container) {
                Some(record) => records.push(record),
                None => {
                    // Extraction warning: non-fatal, the rest of the page
                    // is still returned.
                    tracing::warn!("Skipping malformed quote container on {}", base_url);
                    skipped += 1;
                }
            }
        }
    }

    let next_page = extract_next_page(&document, base_url);

    ExtractedPage {
        records,
        next_page,
        skipped,
    }
}

/// Extracts a single record from one quote container
///
/// Returns None when the expected sub-structure (text or author element)
/// is missing or empty.
fn extract_record(container: &ElementRef<'_>) -> Option<Record> {
    let text_selector = Selector::parse("span.text").ok()?;
    let author_selector = Selector::parse("small.author").ok()?;
    let tag_selector = Selector::parse("a.tag").ok()?;

    let text = element_text(container.select(&text_selector).next()?);
    let author = element_text(container.select(&author_selector).next()?);

    // Tag order matches document order
    let tags: Vec<String> = container
        .select(&tag_selector)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();

    Record::new(text, author, tags).ok()
}

/// Locates the next-page indicator and resolves its reference
fn extract_next_page(document: &Html, base_url: &Url) -> Option<Url> {
    let next_selector = Selector::parse("li.next a[href]").ok()?;

    let href = document
        .select(&next_selector)
        .next()?
        .value()
        .attr("href")?;

    match base_url.join(href.trim()) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Unresolvable next-page reference '{}': {}", href, e);
            None
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
