//! Page retrieval.
//!
//! Two strategies share the [`PageFetcher`] capability:
//!
//! | Strategy | Module | Transport | Gated posts |
//! |----------|--------|-----------|-------------|
//! | Stateless | [`http`] | reqwest, rotated user agent | reported as [`FetchOutcome::Skipped`] |
//! | Authenticated | [`session`] | logged-in WebDriver session | fetched in full |
//!
//! Both pause for a randomized politeness delay before every request (see
//! [`pacing`]). The strategy is chosen by configuration at the call site;
//! the pipeline is generic over the trait.

pub mod http;
pub mod pacing;
pub mod session;
pub mod webdriver;

use crate::error::{Cancelled, FetchError};
use url::Url;

pub use http::{HttpGet, RotatingClient, StatelessFetcher};
pub use pacing::{PolitenessPolicy, TokioSleeper};
pub use session::AuthenticatedFetcher;
pub use webdriver::WebDriverBrowser;

/// Raw page markup and the location it was fetched from.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub location: Url,
    pub html: String,
}

/// Result of fetching one page. Expected branches are variants, not errors.
#[derive(Debug)]
pub enum FetchOutcome {
    Document(Document),
    /// Not retrievable in full without an account. Not a failure.
    Skipped(String),
    Failed(FetchError),
}

/// Retrieves one page at a time.
///
/// Returns `Err(Cancelled)` only when the cancellation hook fires during the
/// politeness or settle delay; per-page failures are
/// [`FetchOutcome::Failed`].
pub trait PageFetcher {
    async fn fetch(&mut self, location: &Url) -> Result<FetchOutcome, Cancelled>;
}
