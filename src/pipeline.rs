//! One harvesting run for a single author.
//!
//! ```text
//! discover → filter → diff → for each new location:
//!     fetch → extract → write artifacts → record in ledger
//! ```
//!
//! Articles are processed one at a time. A failure on one article is
//! counted and logged, and the run moves on. The aggregate list and the
//! ledger are saved once at the end, including after cancellation.

use crate::diff::{existing_identifiers, new_work};
use crate::error::HarvestError;
use crate::extract::Extractor;
use crate::feeds::{FeedReader, unique_by_identifier};
use crate::fetch::{FetchOutcome, HttpGet, PageFetcher};
use crate::filter::filter_locations;
use crate::ledger::{Ledger, LedgerEntry};
use crate::models::{ArticleLocation, EssaySummary, RunReport};
use crate::outputs::artifacts::{self, MARKDOWN_EXT, WriteOutcome};
use crate::outputs::{AuthorPaths, json};
use crate::utils::ensure_writable_dir;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use url::Url;

/// What to harvest and where to put it.
#[derive(Debug, Clone)]
pub struct HarvestPlan {
    pub base: Url,
    pub paths: AuthorPaths,
    /// Inclusive lower bound on feed timestamps.
    pub start: Option<NaiveDate>,
    pub exclude_keywords: Vec<String>,
    /// Skip candidates whose artifacts already exist before fetching anything.
    pub incremental: bool,
    /// Maximum number of articles attempted; `None` for no cap.
    pub limit: Option<usize>,
}

pub struct Harvester<H> {
    plan: HarvestPlan,
    feeds: FeedReader<H>,
    extractor: Extractor,
    cancel: CancellationToken,
}

impl<H: HttpGet> Harvester<H> {
    pub fn new(
        plan: HarvestPlan,
        feeds: FeedReader<H>,
        extractor: Extractor,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            plan,
            feeds,
            extractor,
            cancel,
        }
    }

    /// Run the pipeline with `fetcher`.
    ///
    /// Only storage problems with the output directories, the aggregate list
    /// or the ledger end the run with an error. Discovery failure yields an
    /// empty report.
    #[instrument(level = "info", skip_all, fields(author = %self.plan.paths.author))]
    pub async fn run<F: PageFetcher>(&self, fetcher: &mut F) -> Result<RunReport, HarvestError> {
        let paths = &self.plan.paths;
        ensure_writable_dir(&paths.markdown_dir).await?;
        ensure_writable_dir(&paths.html_dir).await?;
        if let Some(data_dir) = paths.aggregate_file.parent() {
            ensure_writable_dir(data_dir).await?;
        }

        let mut report = RunReport::default();
        let Some(work) = self.plan_work(&mut report).await? else {
            return Ok(report);
        };

        let mut ledger = Ledger::load(&paths.ledger_file).await?;
        let mut summaries: Vec<EssaySummary> = Vec::new();
        let mut attempted = 0usize;

        for location in work {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested; stopping before next article");
                report.cancelled = true;
                break;
            }
            if self.plan.limit.is_some_and(|limit| attempted >= limit) {
                info!(limit = attempted, "Reached article limit");
                break;
            }
            let Some(id) = location.identifier() else {
                continue;
            };
            if artifacts::exists(paths, &id).await {
                report.already_present += 1;
                continue;
            }

            attempted += 1;
            info!(
                progress = attempted,
                url = %location.location,
                "Scraping article"
            );
            let outcome = match fetcher.fetch(&location.location).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    info!("Cancelled during delay");
                    report.cancelled = true;
                    break;
                }
            };

            let document = match outcome {
                FetchOutcome::Document(document) => document,
                FetchOutcome::Skipped(reason) => {
                    info!(url = %location.location, %reason, "Skipped article");
                    report.skipped_gated += 1;
                    continue;
                }
                FetchOutcome::Failed(e) => {
                    warn!(url = %location.location, error = %e, "Fetch failed");
                    report.failed += 1;
                    continue;
                }
            };

            let article = match self.extractor.extract(&document) {
                Ok(article) => article,
                Err(e) => {
                    warn!(url = %location.location, error = %e, "Extraction failed");
                    report.failed += 1;
                    continue;
                }
            };

            match artifacts::write(paths, &article).await {
                Ok(WriteOutcome::Written { markdown, html }) => {
                    ledger.record(article.identifier.clone(), LedgerEntry::from_article(&article));
                    summaries.push(artifacts::summary(&article, &markdown, &html));
                    report.scraped += 1;
                }
                Ok(WriteOutcome::AlreadyPresent(_)) => report.already_present += 1,
                Err(e) => {
                    error!(url = %location.location, error = %e, "Failed to write artifacts");
                    report.failed += 1;
                }
            }
        }

        json::merge_summaries(&paths.aggregate_file, summaries).await?;
        ledger.save().await?;

        info!(
            candidates = report.candidates,
            new = report.new_work,
            scraped = report.scraped,
            skipped_gated = report.skipped_gated,
            failed = report.failed,
            already_present = report.already_present,
            cancelled = report.cancelled,
            "Harvest finished"
        );
        Ok(report)
    }

    /// Discovery, filtering and the incremental diff. `None` when discovery
    /// found nothing to do.
    async fn plan_work(
        &self,
        report: &mut RunReport,
    ) -> Result<Option<Vec<ArticleLocation>>, HarvestError> {
        let discovered = match self.feeds.discover(&self.plan.base).await {
            Ok(locations) => locations,
            Err(e) => {
                warn!(error = %e, "No feed could be read; nothing to do");
                return Ok(None);
            }
        };

        let candidates = unique_by_identifier(filter_locations(
            discovered,
            self.plan.start,
            &self.plan.exclude_keywords,
        ));
        report.candidates = candidates.len();

        let work = if self.plan.incremental {
            let existing = existing_identifiers(&self.plan.paths.markdown_dir, MARKDOWN_EXT).await?;
            new_work(candidates, &existing).new_work
        } else {
            candidates
        };
        report.new_work = work.len();
        Ok(Some(work))
    }
}
