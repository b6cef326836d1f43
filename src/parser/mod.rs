pub mod catalog;
pub mod detail;
pub mod info_table;

use scraper::Html;
use tracing::warn;

use crate::fetch::{FetchError, Page};
use crate::record::ItemRecord;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("product information table not found")]
    MissingInfoTable,
}

/// Field extractor: fetched detail page → record, or `None` when the page
/// could not be fetched or its information table is missing.
pub fn extract(url: &str, fetched: Result<Page, FetchError>) -> Option<ItemRecord> {
    let page = match fetched {
        Ok(page) if page.is_success() => page,
        Ok(page) => {
            warn!("Failed to load {}: HTTP {}", url, page.status);
            return None;
        }
        Err(e) => {
            warn!("Failed to load {}: {}", url, e);
            return None;
        }
    };

    match parse_item(url, &page.body) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping {}: {}", url, e);
            None
        }
    }
}

/// Each field degrades to its placeholder on its own; only a missing
/// information table rejects the whole item.
pub fn parse_item(url: &str, html: &str) -> Result<ItemRecord, ExtractError> {
    let doc = Html::parse_document(html);
    let table = info_table::parse(&doc)?;

    Ok(ItemRecord {
        title: detail::title(&doc),
        genre: detail::genre(&doc),
        rating: detail::rating(&doc),
        upc: table.upc,
        product_type: table.product_type,
        price_excl_tax: table.price_excl_tax,
        price_incl_tax: table.price_incl_tax,
        tax: table.tax,
        in_stock: table.in_stock,
        reviews_count: table.reviews_count,
        description: detail::description(&doc),
        url: url.to_string(),
    })
}

// ── Tests ──
