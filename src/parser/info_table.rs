use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::detail::element_text;
use super::ExtractError;

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.table.table-striped").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static VALUE_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static AVAILABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+) available\)").unwrap());

// Token positions in the flattened table text, for tables without <th> labels.
const POS_UPC: usize = 0;
const POS_PRODUCT_TYPE: usize = 2;
const POS_PRICE_EXCL: usize = 5;
const POS_PRICE_INCL: usize = 8;
const POS_TAX: usize = 9;
const POS_IN_STOCK: usize = 13;
const POS_REVIEWS: usize = 18;

/// The product information table. Fields the table lacks stay empty.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InfoTable {
    pub upc: String,
    pub product_type: String,
    pub price_excl_tax: String,
    pub price_incl_tax: String,
    pub tax: String,
    pub in_stock: String,
    pub reviews_count: String,
}

/// Reads the information table, preferring its `th`/`td` label pairs and
/// falling back to fixed token positions when no labels are present.
pub fn parse(doc: &Html) -> Result<InfoTable, ExtractError> {
    let table = doc.select(&TABLE).next().ok_or(ExtractError::MissingInfoTable)?;
    Ok(labeled(table).unwrap_or_else(|| positional(&element_text(table))))
}

fn labeled(table: ElementRef<'_>) -> Option<InfoTable> {
    let pairs: HashMap<String, String> = table
        .select(&ROW)
        .filter_map(|row| {
            let label = row.select(&HEADER_CELL).next()?;
            let value = row.select(&VALUE_CELL).next()?;
            Some((
                element_text(label).trim().to_string(),
                element_text(value).trim().to_string(),
            ))
        })
        .collect();
    if pairs.is_empty() {
        return None;
    }

    let get = |label: &str| pairs.get(label).map(String::as_str).unwrap_or("");
    Some(InfoTable {
        upc: get("UPC").to_string(),
        product_type: get("Product Type").to_string(),
        price_excl_tax: amount(get("Price (excl. tax)")),
        price_incl_tax: amount(get("Price (incl. tax)")),
        tax: amount(get("Tax")),
        in_stock: available_count(get("Availability")),
        reviews_count: get("Number of reviews").to_string(),
    })
}

/// Legacy layout: `UPC<id> Product Type<kind> Price (excl. tax)£<n> ...`
/// where each label is glued to its value.
fn positional(text: &str) -> InfoTable {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let token = |i: usize| tokens.get(i).copied().unwrap_or("");

    InfoTable {
        upc: strip_label(token(POS_UPC), "UPC"),
        product_type: strip_label(token(POS_PRODUCT_TYPE), "Type"),
        price_excl_tax: amount(token(POS_PRICE_EXCL)),
        price_incl_tax: amount(token(POS_PRICE_INCL)),
        tax: amount(token(POS_TAX)),
        in_stock: token(POS_IN_STOCK).trim_start_matches('(').to_string(),
        reviews_count: token(POS_REVIEWS).to_string(),
    }
}

fn strip_label(token: &str, label: &str) -> String {
    token.strip_prefix(label).unwrap_or(token).to_string()
}

/// Drops everything before the first digit: `£51.77` -> `51.77`.
fn amount(value: &str) -> String {
    value
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .to_string()
}

fn available_count(value: &str) -> String {
    AVAILABLE_RE
        .captures(value)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}
