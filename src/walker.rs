use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use tracing::{info, warn};
use url::Url;

use crate::fetch::Fetcher;
use crate::parser::{self, catalog};
use crate::record::ItemRecord;

const ORIGIN: &str = "https://books.toscrape.com/";
const CATALOGUE_DIR: &str = "catalogue/";
const PAGE_DELAY: Duration = Duration::from_millis(500);

static ORIGIN_URL: LazyLock<Url> = LazyLock::new(|| Url::parse(ORIGIN).unwrap());

/// Why a walk ended. Every variant still hands back whatever was collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    LimitReached,
    EmptyPage,
    EndOfCatalog,
    Failed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::LimitReached => write!(f, "page limit reached"),
            StopReason::EmptyPage => write!(f, "empty catalogue page"),
            StopReason::EndOfCatalog => write!(f, "end of catalogue"),
            StopReason::Failed(why) => write!(f, "failed: {}", why),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalkConfig {
    pub origin: Url,
    /// `None` walks until the catalogue runs out.
    pub page_limit: Option<u32>,
    /// Pause before every catalogue page after the first.
    pub page_delay: Duration,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            origin: ORIGIN_URL.clone(),
            page_limit: None,
            page_delay: PAGE_DELAY,
        }
    }
}

impl WalkConfig {
    pub fn with_page_limit(page_limit: Option<u32>) -> Self {
        Self { page_limit, ..Self::default() }
    }

    fn catalogue_base(&self) -> Result<Url, url::ParseError> {
        self.origin.join(CATALOGUE_DIR)
    }

    /// Page 1 is the bare front page; later pages are `catalogue/page-N.html`.
    pub fn page_url(&self, page: u32) -> Result<Url, url::ParseError> {
        if page <= 1 {
            Ok(self.origin.clone())
        } else {
            self.catalogue_base()?.join(&format!("page-{}.html", page))
        }
    }
}

/// Records of one walk, in catalogue order, plus how the walk went.
#[derive(Debug, Clone)]
pub struct WalkReport {
    pub records: Vec<ItemRecord>,
    pub pages_processed: u32,
    pub page_limit: Option<u32>,
    pub stop_reason: StopReason,
}

impl WalkReport {
    /// Sum of every `price_incl_tax` that parses as a number.
    pub fn total_price_incl_tax(&self) -> f64 {
        self.records
            .iter()
            .filter_map(|r| r.price_incl_tax.parse::<f64>().ok())
            .sum()
    }
}

/// Walk catalogue pages from 1 upward, extracting every listed book.
///
/// Never fails: transport errors, bad statuses and broken items shrink the
/// result and are logged, the reason for stopping is kept in the report.
pub async fn walk<F: Fetcher>(fetcher: &F, config: &WalkConfig) -> WalkReport {
    let mut records = Vec::new();
    let mut pages_processed = 0u32;
    let mut page = 1u32;

    let stop_reason = loop {
        if let Some(limit) = config.page_limit.filter(|&limit| page > limit) {
            info!("Reached the page limit of {}", limit);
            break StopReason::LimitReached;
        }
        if page > 1 {
            tokio::time::sleep(config.page_delay).await;
        }

        let (page_url, base) = match (config.page_url(page), config.catalogue_base()) {
            (Ok(page_url), Ok(base)) => (page_url, base),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Cannot build URL for page {}: {}", page, e);
                break StopReason::Failed(e.to_string());
            }
        };

        let response = match fetcher.get(page_url.as_str()).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Network error on page {}: {}", page, e);
                break StopReason::Failed(e.to_string());
            }
        };
        if response.is_not_found() {
            info!("Reached the end of the catalogue at page {}", page);
            break StopReason::EndOfCatalog;
        }
        if !response.is_success() {
            warn!("Page {} failed with HTTP {}", page, response.status);
            break StopReason::Failed(format!("HTTP {}", response.status));
        }

        let links = catalog::item_links(&Html::parse_document(&response.body));
        if links.is_empty() {
            info!("Page {} lists no books, stopping", page);
            break StopReason::EmptyPage;
        }

        let ok = collect_items(fetcher, &base, &links, &mut records).await;
        info!("Page {}: extracted {}/{} books", page, ok, links.len());

        pages_processed += 1;
        page += 1;
    };

    if records.is_empty() {
        warn!("No books collected ({})", stop_reason);
    } else {
        info!(
            "Scraping finished: {} books from {} pages ({})",
            records.len(),
            pages_processed,
            stop_reason
        );
    }

    WalkReport {
        records,
        pages_processed,
        page_limit: config.page_limit,
        stop_reason,
    }
}

/// Fetch and extract every book card of one page. Returns how many made it.
async fn collect_items<F: Fetcher>(
    fetcher: &F,
    base: &Url,
    links: &[Option<String>],
    records: &mut Vec<ItemRecord>,
) -> usize {
    let pb = ProgressBar::new(links.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut ok = 0usize;
    for href in links {
        pb.inc(1);
        let Some(href) = href else {
            warn!("Skipping a book card without a link");
            continue;
        };
        let url = match catalog::resolve_item_url(base, href) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping unusable link {:?}: {}", href, e);
                continue;
            }
        };

        let fetched = fetcher.get(url.as_str()).await;
        if let Some(record) = guarded(url.as_str(), || parser::extract(url.as_str(), fetched)) {
            records.push(record);
            ok += 1;
        }
    }

    pb.finish_and_clear();
    ok
}

/// Runs one item's extraction; a panic inside it only costs that item.
fn guarded<T>(url: &str, extract: impl FnOnce() -> Option<T>) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(extract)) {
        Ok(item) => item,
        Err(_) => {
            warn!("Extraction of {} panicked, skipping", url);
            None
        }
    }
}
