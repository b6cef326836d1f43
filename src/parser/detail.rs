use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::record::{rating_from_word, NO_DESCRIPTION, NO_GENRE, NO_TITLE};

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li.active").unwrap());
static BREADCRUMB: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul.breadcrumb").unwrap());
static STAR_RATING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p.star-rating").unwrap());
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#product_description ~ p").unwrap());

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Last crumb of the breadcrumb trail.
pub fn title(doc: &Html) -> String {
    doc.select(&TITLE)
        .next()
        .map(|el| element_text(el).trim().to_string())
        .unwrap_or_else(|| NO_TITLE.to_string())
}

/// Third breadcrumb token: Home / Books / <genre> / ...
pub fn genre(doc: &Html) -> String {
    doc.select(&BREADCRUMB)
        .next()
        .and_then(|el| element_text(el).split_whitespace().nth(2).map(str::to_string))
        .unwrap_or_else(|| NO_GENRE.to_string())
}

/// `<p class="star-rating Three">`: the second class token names the stars.
pub fn rating(doc: &Html) -> Option<u8> {
    let el = doc.select(&STAR_RATING).next()?;
    let word = el.value().attr("class")?.split_whitespace().nth(1)?;
    rating_from_word(word)
}

/// First paragraph following the `#product_description` anchor.
pub fn description(doc: &Html) -> String {
    doc.select(&DESCRIPTION)
        .next()
        .map(|el| element_text(el).trim().to_string())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string())
}
