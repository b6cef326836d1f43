use serde::Serialize;

pub const NO_TITLE: &str = "No title";
pub const NO_GENRE: &str = "No genre";
pub const NO_DESCRIPTION: &str = "No description";

/// One extracted book. Immutable once built by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRecord {
    pub title: String,
    pub genre: String,
    /// 1..=5, `None` when the star marker is missing or not a known word.
    pub rating: Option<u8>,
    pub upc: String,
    pub product_type: String,
    pub price_excl_tax: String,
    pub price_incl_tax: String,
    pub tax: String,
    pub in_stock: String,
    pub reviews_count: String,
    pub description: String,
    pub url: String,
}

/// Maps the star-rating class word to its number.
pub fn rating_from_word(word: &str) -> Option<u8> {
    match word {
        "One" => Some(1),
        "Two" => Some(2),
        "Three" => Some(3),
        "Four" => Some(4),
        "Five" => Some(5),
        _ => None,
    }
}
