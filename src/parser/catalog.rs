use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

static PRODUCT_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article.product_pod").unwrap());
static CARD_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3 a").unwrap());

/// Prefix the front page puts on links that are already relative to the
/// catalogue directory elsewhere.
const REDUNDANT_SEGMENT: &str = "catalogue/";

/// One entry per product card, in listing order: the card's raw `href`, or
/// `None` when the card has no title link.
pub fn item_links(doc: &Html) -> Vec<Option<String>> {
    doc.select(&PRODUCT_CARD)
        .map(|card| {
            card.select(&CARD_LINK)
                .find_map(|a| a.value().attr("href"))
                .map(str::to_string)
        })
        .collect()
}

/// Resolves a product `href` against the catalogue base.
pub fn resolve_item_url(catalogue_base: &Url, href: &str) -> Result<Url, url::ParseError> {
    let relative = href.strip_prefix(REDUNDANT_SEGMENT).unwrap_or(href);
    catalogue_base.join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://books.toscrape.com/catalogue/").unwrap()
    }

    #[test]
    fn links_in_listing_order() {
        let html = std::fs::read_to_string("tests/fixtures/catalog_page.html").unwrap();
        let links = item_links(&Html::parse_document(&html));
        assert_eq!(
            links,
            vec![
                Some("sharp-objects_997/index.html".to_string()),
                Some("soumission_998/index.html".to_string()),
                Some("the-requiem-red_995/index.html".to_string()),
            ]
        );
    }

    #[test]
    fn card_without_link_still_counts() {
        let doc = Html::parse_document(
            r#"<ol class="row">
                <li><article class="product_pod"><h3>Untitled</h3></article></li>
                <li><article class="product_pod"><h3><a href="soumission_998/index.html">Soumission</a></h3></article></li>
            </ol>"#,
        );
        assert_eq!(
            item_links(&doc),
            vec![None, Some("soumission_998/index.html".to_string())]
        );
    }

    #[test]
    fn page_without_products() {
        let doc = Html::parse_document("<ol class=\"row\"></ol>");
        assert!(item_links(&doc).is_empty());
    }

    #[test]
    fn both_link_forms_resolve_to_the_same_url() {
        let from_front = resolve_item_url(&base(), "catalogue/soumission_998/index.html").unwrap();
        let from_page = resolve_item_url(&base(), "soumission_998/index.html").unwrap();
        assert_eq!(from_front, from_page);
        assert_eq!(
            from_page.as_str(),
            "https://books.toscrape.com/catalogue/soumission_998/index.html"
        );
    }

    #[test]
    fn absolute_href_is_kept() {
        let url = resolve_item_url(&base(), "https://example.com/x.html").unwrap();
        assert_eq!(url.as_str(), "https://example.com/x.html");
    }
}
