use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::record::ItemRecord;
use crate::walker::WalkReport;

const BANNER_WIDTH: usize = 70;
const REPORT_DIR: &str = "artifacts";
const REPORT_FILE: &str = "books_data.txt";

/// `<parent of cwd>/artifacts/books_data.txt`, or under the cwd itself when
/// it has no parent.
pub fn default_path() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let root = cwd.parent().map(Path::to_path_buf).unwrap_or(cwd);
    Ok(root.join(REPORT_DIR).join(REPORT_FILE))
}

/// Human-readable report: banner, summary, one block per book.
pub fn render(report: &WalkReport, generated_at: DateTime<Local>) -> String {
    let rule = "-".repeat(BANNER_WIDTH);
    let limit = report
        .page_limit
        .map(|limit| format!("Page limit: {}\n", limit))
        .unwrap_or_default();

    let mut out = format!(
        "{rule}\nBooks to Scrape catalogue\n{rule}\n\n\
         Books in catalogue: {}\n\
         Pages processed: {}\n\
         {limit}\
         Report generated: {}\n\n",
        report.records.len(),
        report.pages_processed,
        generated_at.format("%d.%m.%Y %H:%M"),
    );
    for (i, record) in report.records.iter().enumerate() {
        out.push_str(&render_record(i + 1, record));
        out.push_str(&rule);
        out.push_str("\n\n");
    }
    out
}

fn render_record(number: usize, r: &ItemRecord) -> String {
    let rating = r
        .rating
        .map(|stars| format!("{}/5", stars))
        .unwrap_or_else(|| "N/A".to_string());

    let fields = [
        ("Title", r.title.clone()),
        ("Genre", r.genre.clone()),
        ("Rating", rating),
        ("UPC", r.upc.clone()),
        ("Product type", r.product_type.clone()),
        ("Price (excl. tax)", format!("£{}", r.price_excl_tax)),
        ("Price (incl. tax)", format!("£{}", r.price_incl_tax)),
        ("Tax", r.tax.clone()),
        ("In stock", format!("{} pcs.", r.in_stock)),
        ("Reviews", r.reviews_count.clone()),
        ("Description", r.description.clone()),
        ("Link", r.url.clone()),
    ];

    let mut block = format!("   Book #{}\n", number);
    for (label, value) in fields {
        block.push_str(&format!("   {}: {}\n", label, value));
    }
    block
}

/// Write the report to `path`, creating missing parent directories.
pub fn write(report: &WalkReport, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    fs::write(path, render(report, Local::now()))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// [`write`], logging the outcome instead of returning the error. A walk
/// that collected nothing leaves the previous report in place.
pub fn save(report: &WalkReport, path: &Path) -> bool {
    if report.records.is_empty() {
        warn!(
            "No books collected ({}), keeping the existing report at {}",
            report.stop_reason,
            path.display()
        );
        return false;
    }
    match write(report, path) {
        Ok(()) => {
            info!("Saved {} books to {}", report.records.len(), path.display());
            true
        }
        Err(e) => {
            warn!("Could not save report: {:#}", e);
            false
        }
    }
}
