mod fetch;
mod parser;
mod record;
mod report;
mod schedule;
mod walker;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use fetch::{Fetcher, HttpFetcher};
use schedule::{DailyJob, ScrapeJob, Scheduler};
use walker::WalkConfig;

#[derive(Parser)]
#[command(name = "books_scraper", about = "Books to Scrape catalogue scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the catalogue once
    Scrape {
        /// Max catalogue pages to walk (default: all)
        #[arg(short = 'n', long)]
        pages: Option<u32>,
        /// Save a text report
        #[arg(long)]
        save: bool,
        /// Report path (default: ../artifacts/books_data.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract a single book page
    Book {
        /// Absolute URL of the book's detail page
        url: String,
    },
    /// Scrape the whole catalogue every day until Ctrl-C
    Schedule {
        /// Daily start time, 24-hour HH:MM
        #[arg(long)]
        at: String,
        /// Also run once right away
        #[arg(long)]
        now: bool,
        /// Report path (default: ../artifacts/books_data.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape { pages, save, output, json } => {
            let fetcher = HttpFetcher::new()?;
            let walked = walker::walk(&fetcher, &WalkConfig::with_page_limit(pages)).await;

            if save {
                let path = match output {
                    Some(path) => path,
                    None => report::default_path()?,
                };
                report::save(&walked, &path);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&walked.records)?);
            }

            println!(
                "Collected {} books from {} pages ({}).",
                walked.records.len(),
                walked.pages_processed,
                walked.stop_reason
            );
            if !walked.records.is_empty() {
                println!("Total price incl. tax: £{:.2}", walked.total_price_incl_tax());
            }
            Ok(())
        }
        Commands::Book { url } => {
            let fetcher = HttpFetcher::new()?;
            let fetched = fetcher.get(&url).await;
            let record = parser::extract(&url, fetched)
                .with_context(|| format!("No book could be extracted from {}", url))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Schedule { at, now, output } => {
            let report_path = match output {
                Some(path) => path,
                None => report::default_path()?,
            };
            let job = DailyJob {
                at: schedule::parse_time_of_day(&at)?,
                run_immediately: now,
                action: ScrapeJob {
                    fetcher: HttpFetcher::new()?,
                    config: WalkConfig::with_page_limit(None),
                    report_path,
                },
            };
            Scheduler::default().run(&job).await
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
