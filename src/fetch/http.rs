//! Anonymous HTTP retrieval.
//!
//! [`RotatingClient`] sends each request with a user agent drawn from the
//! configured pool plus browser-like politeness headers. It backs both the
//! feed reader and the [`StatelessFetcher`].

use super::pacing::{PolitenessPolicy, Sleeper};
use super::{Document, FetchOutcome, PageFetcher};
use crate::error::{Cancelled, ExtractionError, FetchError};
use crate::extract::compile_selector;
use rand::rng;
use rand::seq::IndexedRandom;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS, USER_AGENT};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Status and body of a completed GET.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single GET request. Implemented by [`RotatingClient`] and by test fakes.
pub trait HttpGet {
    async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError>;
}

/// reqwest client that rotates its user agent per request.
#[derive(Debug, Clone)]
pub struct RotatingClient {
    client: Client,
    user_agents: Vec<String>,
}

impl RotatingClient {
    pub fn new(user_agents: Vec<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            user_agents,
        })
    }

    /// Pick a user agent for the next request.
    pub fn user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rng())
            .map(String::as_str)
            .unwrap_or("Mozilla/5.0")
    }
}

impl HttpGet for RotatingClient {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, self.user_agent())
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(UPGRADE_INSECURE_REQUESTS, "1")
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, bytes = body.len(), "GET complete");
        Ok(HttpResponse { status, body })
    }
}

/// Page fetcher for content readable without an account.
///
/// Pages carrying the paywall marker are reported as
/// [`FetchOutcome::Skipped`] so the extractor never sees a truncated post.
#[derive(Debug)]
pub struct StatelessFetcher<H, S> {
    http: H,
    sleeper: S,
    politeness: PolitenessPolicy,
    paywall: Selector,
}

impl<H: HttpGet, S: Sleeper> StatelessFetcher<H, S> {
    pub fn new(
        http: H,
        sleeper: S,
        politeness: PolitenessPolicy,
        paywall_selector: &str,
    ) -> Result<Self, ExtractionError> {
        Ok(Self {
            http,
            sleeper,
            politeness,
            paywall: compile_selector(paywall_selector)?,
        })
    }

    fn is_gated(&self, html: &str) -> bool {
        Html::parse_document(html)
            .select(&self.paywall)
            .next()
            .is_some()
    }
}

impl<H: HttpGet, S: Sleeper> PageFetcher for StatelessFetcher<H, S> {
    #[instrument(level = "info", skip_all, fields(%location))]
    async fn fetch(&mut self, location: &Url) -> Result<FetchOutcome, Cancelled> {
        self.politeness.pause(&self.sleeper).await?;

        let response = match self.http.get(location).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Page request failed");
                return Ok(FetchOutcome::Failed(e));
            }
        };
        if !response.is_success() {
            return Ok(FetchOutcome::Failed(FetchError::Status {
                url: location.to_string(),
                status: response.status,
            }));
        }
        if self.is_gated(&response.body) {
            return Ok(FetchOutcome::Skipped(
                "premium article behind paywall".to_string(),
            ));
        }
        Ok(FetchOutcome::Document(Document {
            location: location.clone(),
            html: response.body,
        }))
    }
}
