//! Authenticated page retrieval through a logged-in browser session.
//!
//! Login is an explicit state machine:
//!
//! ```text
//! NotLoggedIn ──goto sign-in──▶ AwaitingPasswordOption ──credentials──▶ Submitted
//!                                                                        │
//!                                              LoggedIn ◀──no error─────┤
//!                                              LoginFailed ◀──error─────┘
//! ```
//!
//! Every transition waits a fixed settle delay through the injected
//! [`Sleeper`]. `LoginFailed` is terminal: the run aborts and no second
//! attempt is made, since repeated failures trip bot defenses.

use super::pacing::{PolitenessPolicy, Sleeper};
use super::{Document, FetchOutcome, PageFetcher};
use crate::config::{Credentials, SessionConfig, SettleTimings};
use crate::error::{AuthenticationError, BrowserError, Cancelled, FetchError};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Element lookup strategies understood by every [`BrowserDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator<'a> {
    Css(&'a str),
    XPath(&'a str),
    Id(&'a str),
}

/// The minimal browser surface needed to sign in and read pages.
pub trait BrowserDriver {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn click(&mut self, target: Locator<'_>) -> Result<(), BrowserError>;

    async fn type_into(&mut self, target: Locator<'_>, text: &str) -> Result<(), BrowserError>;

    /// `Ok(false)` when no element matches.
    async fn is_displayed(&mut self, target: Locator<'_>) -> Result<bool, BrowserError>;

    async fn page_source(&mut self) -> Result<String, BrowserError>;

    /// End the browser session and release the transport.
    async fn quit(self) -> Result<(), BrowserError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    NotLoggedIn,
    AwaitingPasswordOption,
    Submitted,
    LoggedIn,
    LoginFailed(String),
}

impl LoginState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoginState::LoggedIn | LoginState::LoginFailed(_))
    }
}

/// Drives [`LoginState`] forward one transition at a time.
#[derive(Debug)]
pub struct LoginFlow<'a> {
    config: &'a SessionConfig,
    credentials: &'a Credentials,
    state: LoginState,
}

impl<'a> LoginFlow<'a> {
    pub fn new(config: &'a SessionConfig, credentials: &'a Credentials) -> Self {
        Self {
            config,
            credentials,
            state: LoginState::NotLoggedIn,
        }
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    /// Perform the action for the current state and move to the next one.
    pub async fn step<D: BrowserDriver, S: Sleeper>(
        &mut self,
        driver: &mut D,
        sleeper: &S,
    ) -> Result<&LoginState, Cancelled> {
        let settle: &SettleTimings = &self.config.settle;
        let selectors = &self.config.selectors;

        let next = match &self.state {
            LoginState::NotLoggedIn => match driver.goto(&self.config.sign_in_url).await {
                Ok(()) => {
                    sleeper.sleep(settle.sign_in()).await?;
                    LoginState::AwaitingPasswordOption
                }
                Err(e) => LoginState::LoginFailed(format!("sign-in page unreachable: {e}")),
            },
            LoginState::AwaitingPasswordOption => {
                match driver.click(Locator::XPath(&selectors.password_option)).await {
                    Ok(()) => {
                        sleeper.sleep(settle.password_option()).await?;
                        match self.submit_credentials(driver).await {
                            Ok(()) => {
                                sleeper.sleep(settle.submit()).await?;
                                LoginState::Submitted
                            }
                            Err(e) => LoginState::LoginFailed(format!("credential form: {e}")),
                        }
                    }
                    Err(e) => LoginState::LoginFailed(format!("password option missing: {e}")),
                }
            }
            LoginState::Submitted => {
                match driver.is_displayed(Locator::Id(&selectors.error_container)).await {
                    Ok(false) => LoginState::LoggedIn,
                    Ok(true) => LoginState::LoginFailed("sign-in form reported an error".to_string()),
                    Err(e) => LoginState::LoginFailed(format!("could not confirm sign-in: {e}")),
                }
            }
            LoginState::LoggedIn | LoginState::LoginFailed(_) => self.state.clone(),
        };

        debug!(from = ?self.state, to = ?next, "Login transition");
        self.state = next;
        Ok(&self.state)
    }

    /// Step until a terminal state.
    #[instrument(level = "info", skip_all, fields(sign_in_url = %self.config.sign_in_url))]
    pub async fn run<D: BrowserDriver, S: Sleeper>(
        &mut self,
        driver: &mut D,
        sleeper: &S,
    ) -> Result<(), AuthenticationError> {
        while !self.state().is_terminal() {
            if sleeper.is_cancelled() {
                return Err(AuthenticationError::Cancelled);
            }
            self.step(driver, sleeper).await?;
        }
        match self.state() {
            LoginState::LoggedIn => {
                info!("Signed in");
                Ok(())
            }
            LoginState::LoginFailed(reason) => {
                error!(%reason, "Sign-in failed");
                Err(AuthenticationError::LoginFailed(reason.clone()))
            }
            _ => unreachable!("loop exits only on a terminal state"),
        }
    }

    async fn submit_credentials<D: BrowserDriver>(&self, driver: &mut D) -> Result<(), BrowserError> {
        let selectors = &self.config.selectors;
        driver
            .type_into(Locator::Css(&selectors.email_field), &self.credentials.email)
            .await?;
        driver
            .type_into(Locator::Css(&selectors.password_field), &self.credentials.password)
            .await?;
        driver.click(Locator::XPath(&selectors.submit)).await
    }
}

/// Page fetcher backed by a signed-in browser session.
///
/// Obtain one with [`AuthenticatedFetcher::open`] and release it with
/// [`AuthenticatedFetcher::close`] or [`AuthenticatedFetcher::scoped`]; the
/// browser is quit exactly once on every path, including a failed login.
#[derive(Debug)]
pub struct AuthenticatedFetcher<D: BrowserDriver, S> {
    driver: Option<D>,
    sleeper: S,
    politeness: PolitenessPolicy,
    page_settle: std::time::Duration,
}

impl<D: BrowserDriver, S: Sleeper> AuthenticatedFetcher<D, S> {
    /// Sign in on `driver`. On failure the driver is quit before returning.
    pub async fn open(
        mut driver: D,
        sleeper: S,
        politeness: PolitenessPolicy,
        config: &SessionConfig,
        credentials: &Credentials,
    ) -> Result<Self, AuthenticationError> {
        let login = LoginFlow::new(config, credentials).run(&mut driver, &sleeper).await;
        if let Err(e) = login {
            if let Err(quit_err) = driver.quit().await {
                warn!(error = %quit_err, "Failed to quit browser after unsuccessful sign-in");
            }
            return Err(e);
        }
        Ok(Self {
            driver: Some(driver),
            sleeper,
            politeness,
            page_settle: config.settle.page(),
        })
    }

    /// Quit the browser session.
    pub async fn close(mut self) {
        if let Some(driver) = self.driver.take() {
            match driver.quit().await {
                Ok(()) => info!("Browser session closed"),
                Err(e) => warn!(error = %e, "Browser session did not close cleanly"),
            }
        }
    }

    /// Run `body` with this fetcher, then close it regardless of the result.
    pub async fn scoped<T>(mut self, body: impl AsyncFnOnce(&mut Self) -> T) -> T {
        let out = body(&mut self).await;
        self.close().await;
        out
    }
}

impl<D: BrowserDriver, S> Drop for AuthenticatedFetcher<D, S> {
    fn drop(&mut self) {
        if self.driver.is_some() {
            warn!("Authenticated fetcher dropped without close(); browser session may linger");
        }
    }
}

impl<D: BrowserDriver, S: Sleeper> PageFetcher for AuthenticatedFetcher<D, S> {
    #[instrument(level = "info", skip_all, fields(%location))]
    async fn fetch(&mut self, location: &Url) -> Result<FetchOutcome, Cancelled> {
        self.politeness.pause(&self.sleeper).await?;

        let Some(driver) = self.driver.as_mut() else {
            return Ok(FetchOutcome::Failed(FetchError::Browser(BrowserError::Session(
                "session already closed".to_string(),
            ))));
        };
        if let Err(e) = driver.goto(location.as_str()).await {
            warn!(error = %e, "Navigation failed");
            return Ok(FetchOutcome::Failed(e.into()));
        }
        self.sleeper.sleep(self.page_settle).await?;
        match driver.page_source().await {
            Ok(html) => Ok(FetchOutcome::Document(Document {
                location: location.clone(),
                html,
            })),
            Err(e) => {
                warn!(error = %e, "Could not read page source");
                Ok(FetchOutcome::Failed(e.into()))
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    /// Scripted browser. Records commands; `quit` count is shared so tests
    /// can observe it after the driver is consumed.
    #[derive(Debug, Clone, Default)]
    pub struct FakeBrowser {
        pub log: Arc<Mutex<Vec<String>>>,
        pub quits: Arc<Mutex<usize>>,
        pub pages: HashMap<String, String>,
        pub missing: HashSet<String>,
        pub error_shown: bool,
        current: Option<String>,
    }

    impl FakeBrowser {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        /// Make lookups of this selector fail.
        pub fn without(mut self, selector: &str) -> Self {
            self.missing.insert(selector.to_string());
            self
        }

        pub fn rejecting_login(mut self) -> Self {
            self.error_shown = true;
            self
        }

        pub fn quit_count(&self) -> usize {
            *self.quits.lock().unwrap()
        }

        pub fn commands(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn lookup(&self, target: Locator<'_>) -> Result<(), BrowserError> {
            let key = match target {
                Locator::Css(s) | Locator::XPath(s) | Locator::Id(s) => s,
            };
            if self.missing.contains(key) {
                Err(BrowserError::Command(format!("no such element: {key}")))
            } else {
                Ok(())
            }
        }
    }

    impl BrowserDriver for FakeBrowser {
        async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
            self.log.lock().unwrap().push(format!("goto {url}"));
            if self.missing.contains(url) {
                return Err(BrowserError::Command(format!("navigation to {url} failed")));
            }
            self.current = Some(url.to_string());
            Ok(())
        }

        async fn click(&mut self, target: Locator<'_>) -> Result<(), BrowserError> {
            self.log.lock().unwrap().push(format!("click {target:?}"));
            self.lookup(target)
        }

        async fn type_into(&mut self, target: Locator<'_>, _text: &str) -> Result<(), BrowserError> {
            self.log.lock().unwrap().push(format!("type {target:?}"));
            self.lookup(target)
        }

        async fn is_displayed(&mut self, _target: Locator<'_>) -> Result<bool, BrowserError> {
            Ok(self.error_shown)
        }

        async fn page_source(&mut self) -> Result<String, BrowserError> {
            let current = self.current.clone().unwrap_or_default();
            self.pages
                .get(&current)
                .cloned()
                .ok_or_else(|| BrowserError::Command(format!("no page at {current}")))
        }

        async fn quit(self) -> Result<(), BrowserError> {
            *self.quits.lock().unwrap() += 1;
            Ok(())
        }
    }
}
