//! # Awful Essays
//!
//! Incrementally harvests long-form posts from a newsletter author's feeds
//! into Markdown and standalone HTML, keeping a per-author aggregate list and
//! a metadata ledger alongside.
//!
//! ## Usage
//!
//! ```sh
//! awful_essays scrape https://foo.substack.com --update
//! awful_essays list
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: read `sitemap.xml`, falling back to `feed.xml` once
//! 2. **Selection**: drop posts before the start date, non-article pages and
//!    (with `--update`) posts already on disk
//! 3. **Fetching**: anonymous HTTP, or a signed-in browser session with
//!    `--premium`, one page at a time with a randomized politeness delay
//! 4. **Output**: extract each post, write `.html` then `.md`, then merge the
//!    aggregate list and save the ledger

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

mod cli;
mod config;
mod diff;
mod error;
mod extract;
mod feeds;
mod fetch;
mod filter;
mod ledger;
mod listing;
mod models;
mod outputs;
mod pipeline;
mod utils;

use cli::{Cli, Command, OutputDirs, ScrapeArgs};
use config::{Credentials, HarvestConfig};
use error::{AuthenticationError, HarvestError};
use extract::Extractor;
use feeds::FeedReader;
use fetch::{
    AuthenticatedFetcher, PolitenessPolicy, RotatingClient, StatelessFetcher, TokioSleeper,
    WebDriverBrowser,
};
use filter::months_before;
use listing::list_authors;
use outputs::AuthorPaths;
use pipeline::{HarvestPlan, Harvester};
use utils::{author_name, normalize_base};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();

    match args.command {
        Command::Scrape(args) => scrape(args).await?,
        Command::List { dirs } => list(&dirs).await?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

async fn scrape(args: ScrapeArgs) -> Result<(), Box<dyn Error>> {
    let mut config = HarvestConfig::load(args.config.as_deref())?;
    if let Some(url) = &args.webdriver_url {
        config.session.webdriver_url = url.clone();
    }
    if args.show_browser {
        config.session.headless = false;
    }
    if args.user_agent.is_some() {
        config.session.user_agent = args.user_agent.clone();
    }

    let base = normalize_base(Url::parse(&args.url)?);
    let author = author_name(&base)
        .ok_or_else(|| HarvestError::Config(format!("cannot derive an author name from {base}")))?;
    let start = args.start_date.or_else(|| {
        args.since_months
            .map(|months| months_before(Local::now().date_naive(), months))
    });
    info!(%base, %author, ?start, update = args.update, premium = args.premium, "Starting scrape");

    let plan = HarvestPlan {
        base,
        paths: AuthorPaths::new(&author, &args.dirs.md_dir, &args.dirs.html_dir, &args.dirs.data_dir),
        start,
        exclude_keywords: config.exclude_keywords.clone(),
        incremental: args.update,
        limit: args.limit(),
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current article");
            interrupt.cancel();
        }
    });

    let http = RotatingClient::new(config.user_agents.clone(), config.request_timeout())?;
    let harvester = Harvester::new(
        plan,
        FeedReader::new(http.clone()),
        Extractor::new(&config.markup)?,
        cancel.clone(),
    );
    let sleeper = TokioSleeper::new(cancel);
    let politeness = PolitenessPolicy::from(config.politeness);

    let report = if args.premium {
        let (Some(email), Some(password)) = (args.email, args.password) else {
            return Err(HarvestError::from(AuthenticationError::MissingCredentials).into());
        };
        let credentials = Credentials { email, password };
        let user_agent = config
            .session
            .user_agent
            .clone()
            .unwrap_or_else(|| http.user_agent().to_string());
        let browser = WebDriverBrowser::connect(&config.session, &user_agent)
            .await
            .map_err(AuthenticationError::from)?;
        let fetcher =
            AuthenticatedFetcher::open(browser, sleeper, politeness, &config.session, &credentials)
                .await?;
        fetcher.scoped(async |f| harvester.run(f).await).await?
    } else {
        let mut fetcher = StatelessFetcher::new(http, sleeper, politeness, &config.markup.paywall)?;
        harvester.run(&mut fetcher).await?
    };

    info!(report = %serde_json::to_string(&report)?, "Run report");
    if report.cancelled {
        warn!("Run was cancelled before all articles were processed");
    }
    Ok(())
}

async fn list(dirs: &OutputDirs) -> Result<(), Box<dyn Error>> {
    let authors = list_authors(&dirs.md_dir, &dirs.data_dir).await?;
    if authors.is_empty() {
        println!("No scraped authors under {}", dirs.md_dir.display());
    }
    for author in authors {
        println!("{author}");
    }
    Ok(())
}
