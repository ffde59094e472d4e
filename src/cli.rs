//! Command-line interface definitions for Awful Essays.
//!
//! Two subcommands: `scrape` harvests one author, `list` reports what has
//! already been harvested. Credentials for premium scraping can come from
//! the environment instead of flags.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Awful Essays application.
///
/// # Examples
///
/// ```sh
/// # Scrape every public post of an author
/// awful_essays scrape https://www.thefitzwilliam.com/
///
/// # Only fetch posts not already on disk, from the last 12 months
/// awful_essays scrape https://foo.substack.com --update --since-months 12
///
/// # Signed-in scrape through a running chromedriver
/// SUBSTACK_EMAIL=me@example.com SUBSTACK_PASSWORD=... \
///     awful_essays scrape https://foo.substack.com --premium
///
/// # Show scraped authors
/// awful_essays list
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape posts from one author's publication
    Scrape(ScrapeArgs),

    /// List authors with scraped posts
    List {
        #[command(flatten)]
        dirs: OutputDirs,
    },
}

/// Output roots; each author gets its own subdirectory or file inside them.
#[derive(Args, Debug, Clone)]
pub struct OutputDirs {
    /// Directory for Markdown files
    #[arg(short = 'd', long, alias = "directory", default_value = "substack_md_files")]
    pub md_dir: PathBuf,

    /// Directory for HTML files
    #[arg(long, alias = "html-directory", default_value = "substack_html_pages")]
    pub html_dir: PathBuf,

    /// Directory for the aggregate list and metadata ledger
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Base URL of the publication, e.g. https://foo.substack.com
    pub url: String,

    #[command(flatten)]
    pub dirs: OutputDirs,

    /// Only scrape posts from this date onwards (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Only scrape posts from the last N months (ignored with --start-date)
    #[arg(long, conflicts_with = "start_date")]
    pub since_months: Option<u32>,

    /// Only scrape posts not already downloaded
    #[arg(short, long)]
    pub update: bool,

    /// Number of posts to scrape (0 for all)
    #[arg(short, long, default_value_t = 0)]
    pub number: usize,

    /// Sign in through a browser session to read subscriber-only posts
    #[arg(short, long)]
    pub premium: bool,

    /// WebDriver endpoint for --premium (overrides the config file)
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub show_browser: bool,

    /// Browser user agent for --premium (default: drawn from the pool)
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Account email for --premium
    #[arg(long, env = "SUBSTACK_EMAIL")]
    pub email: Option<String>,

    /// Account password for --premium
    #[arg(long, env = "SUBSTACK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl ScrapeArgs {
    /// `--number` as a cap, with 0 meaning unlimited.
    pub fn limit(&self) -> Option<usize> {
        (self.number > 0).then_some(self.number)
    }
}
