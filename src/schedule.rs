use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, NaiveTime};
use tracing::{info, warn};

use crate::fetch::Fetcher;
use crate::report;
use crate::walker::{self, WalkConfig};

const CHECK_INTERVAL: Duration = Duration::from_secs(3600);

/// Parses a 24-hour `HH:MM` time of day.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .with_context(|| format!("Invalid time {:?}, expected HH:MM", s))
}

/// Next moment the job is due: today at `at` if still ahead, else tomorrow.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

pub trait JobAction {
    async fn run(&self);
}

/// A job that fires every day at `at`, and once at startup if asked.
pub struct DailyJob<A> {
    pub at: NaiveTime,
    pub run_immediately: bool,
    pub action: A,
}

/// Walks the catalogue and saves the report. Each run starts from an empty
/// record set.
pub struct ScrapeJob<F> {
    pub fetcher: F,
    pub config: WalkConfig,
    pub report_path: PathBuf,
}

impl<F: Fetcher> JobAction for ScrapeJob<F> {
    async fn run(&self) {
        info!(
            "Starting Books to Scrape run at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let result = walker::walk(&self.fetcher, &self.config).await;
        report::save(&result, &self.report_path);
    }
}

pub struct Scheduler {
    /// Longest stretch the wait loop sleeps before re-checking the clock.
    pub check_interval: Duration,
    clock: Box<dyn Fn() -> NaiveDateTime>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(CHECK_INTERVAL)
    }
}

impl Scheduler {
    pub fn new(check_interval: Duration) -> Self {
        Self::with_clock(check_interval, || Local::now().naive_local())
    }

    pub fn with_clock(
        check_interval: Duration,
        clock: impl Fn() -> NaiveDateTime + 'static,
    ) -> Self {
        Self { check_interval, clock: Box::new(clock) }
    }

    /// Runs `job` until Ctrl-C.
    pub async fn run<A: JobAction>(&self, job: &DailyJob<A>) -> Result<()> {
        self.run_until(job, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs `job` until `shutdown` resolves. A job in flight is dropped at
    /// its next await point.
    pub async fn run_until<A, S>(&self, job: &DailyJob<A>, shutdown: S) -> Result<()>
    where
        A: JobAction,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Schedule set: daily run at {}", job.at.format("%H:%M"));

        let work = async {
            if job.run_immediately {
                info!("Running immediately");
                job.action.run().await;
            }

            let mut next = next_run_after((self.clock)(), job.at);
            info!("Scheduler started, next run at {}", next.format("%Y-%m-%d %H:%M"));
            loop {
                let now = (self.clock)();
                if now >= next {
                    job.action.run().await;
                    next = next_run_after((self.clock)(), job.at);
                    info!("Next run at {}", next.format("%Y-%m-%d %H:%M"));
                    continue;
                }
                let until_due = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(until_due.min(self.check_interval)).await;
            }
        };

        tokio::select! {
            _ = work => {}
            _ = &mut shutdown => info!("Scheduler stopped by user"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;

    use super::*;
    use crate::fetch::testing::FakeFetcher;

    struct Counter(AtomicUsize);

    impl JobAction for Counter {
        async fn run(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn on(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap().and_time(at(h, m))
    }

    #[test]
    fn parses_times() {
        assert_eq!(parse_time_of_day("09:00").unwrap(), at(9, 0));
        assert_eq!(parse_time_of_day("23:59").unwrap(), at(23, 59));
        assert_eq!(parse_time_of_day(" 07:05 ").unwrap(), at(7, 5));
        assert!(parse_time_of_day("24:00").is_err());
        assert!(parse_time_of_day("9am").is_err());
        assert!(parse_time_of_day("").is_err());
    }

    #[test]
    fn due_later_today() {
        assert_eq!(next_run_after(on(10, 8, 0), at(9, 0)), on(10, 9, 0));
    }

    #[test]
    fn due_tomorrow_once_passed() {
        assert_eq!(next_run_after(on(10, 9, 30), at(9, 0)), on(11, 9, 0));
        // exactly on time counts as passed; the run just happened
        assert_eq!(next_run_after(on(10, 9, 0), at(9, 0)), on(11, 9, 0));
    }

    #[test]
    fn due_rolls_over_month_end() {
        assert_eq!(
            next_run_after(on(31, 23, 59), at(0, 0)),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_time(at(0, 0))
        );
    }

    #[tokio::test]
    async fn immediate_run_then_shutdown() {
        let job = DailyJob {
            at: (Local::now() + chrono::Duration::hours(2)).time(),
            run_immediately: true,
            action: Counter(AtomicUsize::new(0)),
        };
        let scheduler = Scheduler::new(Duration::from_millis(10));

        scheduler
            .run_until(&job, tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        assert_eq!(job.action.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_run_without_immediate_flag() {
        let job = DailyJob {
            at: (Local::now() + chrono::Duration::hours(2)).time(),
            run_immediately: false,
            action: Counter(AtomicUsize::new(0)),
        };
        let scheduler = Scheduler::new(Duration::from_millis(10));

        scheduler
            .run_until(&job, tokio::time::sleep(Duration::from_millis(30)))
            .await
            .unwrap();

        assert_eq!(job.action.0.load(Ordering::SeqCst), 0);
    }

    /// Clock that reads `first` once, then `later` on every following call.
    fn stepping_clock(first: NaiveDateTime, later: NaiveDateTime) -> impl Fn() -> NaiveDateTime {
        let calls = Cell::new(0u32);
        move || {
            let n = calls.get();
            calls.set(n + 1);
            if n == 0 { first } else { later }
        }
    }

    #[tokio::test]
    async fn runs_once_when_due() {
        let job = DailyJob {
            at: at(9, 0),
            run_immediately: false,
            action: Counter(AtomicUsize::new(0)),
        };
        // started at 08:59, the clock then reads 09:00:30
        let clock = stepping_clock(on(10, 8, 59), on(10, 9, 0) + chrono::Duration::seconds(30));
        let scheduler = Scheduler::with_clock(Duration::from_millis(10), clock);

        scheduler
            .run_until(&job, tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        // after the run the next slot is tomorrow, so no second run
        assert_eq!(job.action.0.load(Ordering::SeqCst), 1);
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn scrape_job(fetcher: FakeFetcher, report_path: PathBuf) -> ScrapeJob<FakeFetcher> {
        ScrapeJob {
            fetcher,
            config: WalkConfig {
                page_delay: Duration::ZERO,
                ..WalkConfig::default()
            },
            report_path,
        }
    }

    #[tokio::test]
    async fn scrape_job_writes_report() {
        let base = "https://books.toscrape.com/catalogue/";
        let fetcher = FakeFetcher::default()
            .with_page("https://books.toscrape.com/", &fixture("catalog_page"))
            .with_page(&format!("{}sharp-objects_997/index.html", base), &fixture("book_sharp_objects"))
            .with_page(&format!("{}soumission_998/index.html", base), &fixture("book_soumission"));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts").join("books_data.txt");

        scrape_job(fetcher, path.clone()).run().await;

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Books in catalogue: 2\n"));
        assert!(text.contains("Pages processed: 1\n"));
        assert_eq!(text.matches("   Book #").count(), 2);
        assert!(text.contains("   Title: Sharp Objects\n"));
    }

    #[tokio::test]
    async fn failed_run_keeps_yesterdays_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books_data.txt");
        std::fs::write(&path, "yesterday's report").unwrap();

        let fetcher = FakeFetcher::default().with_status("https://books.toscrape.com/", 503);
        scrape_job(fetcher, path.clone()).run().await;

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "yesterday's report");
    }
}
